use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Lifecycle of an order.
///
/// `Open` is the customer's cart. `Open` and `Checkout` together form the
/// "active" order that settlement operates on. `Shipped` and `Cancelled` are
/// terminal: a new cart is created instead of reviving one of those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Open,
    Checkout,
    Paid,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    pub const ACTIVE: [OrderStatus; 2] = [OrderStatus::Open, OrderStatus::Checkout];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "Open",
            OrderStatus::Checkout => "Checkout",
            OrderStatus::Paid => "Paid",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    /// Card and terminal settlement move an `Open` order straight to
    /// `Paid`/`Cancelled`; bank settlement goes through `Checkout` first.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Open, Checkout)
                | (Open, Paid)
                | (Open, Cancelled)
                | (Checkout, Paid)
                | (Checkout, Cancelled)
                | (Paid, Shipped)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(OrderStatus::Open),
            "Checkout" => Ok(OrderStatus::Checkout),
            "Paid" => Ok(OrderStatus::Paid),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(AppError::Internal(anyhow::anyhow!(
                "unknown order status {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderDetails {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub discount: Decimal,
    pub creation_date: DateTime<Utc>,
}

impl OrderDetails {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity) * (Decimal::ONE - self.discount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub required_date: Option<DateTime<Utc>>,
    pub shipped_date: Option<DateTime<Utc>>,
    pub paid_date: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub sum: Decimal,
    pub details: Vec<OrderDetails>,
}

impl Order {
    /// A fresh, empty cart.
    pub fn open(customer_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            order_date: now,
            required_date: None,
            shipped_date: None,
            paid_date: None,
            status: OrderStatus::Open,
            sum: Decimal::ZERO,
            details: Vec::new(),
        }
    }

    pub fn details_total(&self) -> Decimal {
        self.details
            .iter()
            .map(OrderDetails::line_total)
            .sum::<Decimal>()
            .round_dp(2)
    }

    /// Only an `Open` cart may change its line items.
    pub fn ensure_mutable(&self) -> AppResult<()> {
        if self.status != OrderStatus::Open {
            return Err(AppError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Open,
            });
        }
        Ok(())
    }

    pub fn transition(&mut self, next: OrderStatus, now: DateTime<Utc>) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        match next {
            OrderStatus::Paid => self.paid_date = Some(now),
            OrderStatus::Shipped => self.shipped_date = Some(now),
            _ => {}
        }
        self.status = next;
        Ok(())
    }
}

/// The channel a customer wants order confirmations on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Email,
    Sms,
    Push,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Email => "email",
            NotificationType::Sms => "sms",
            NotificationType::Push => "push",
        }
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(NotificationType::Email),
            "sms" => Ok(NotificationType::Sms),
            "push" => Ok(NotificationType::Push),
            _ => Err(s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn detail(order_id: Uuid, name: &str, price: Decimal, quantity: i32, discount: Decimal) -> OrderDetails {
        OrderDetails {
            id: Uuid::new_v4(),
            order_id,
            product_id: Uuid::new_v4(),
            product_name: name.into(),
            price,
            quantity,
            discount,
            creation_date: Utc::now(),
        }
    }

    #[test]
    fn sum_applies_quantity_and_discount() {
        let mut order = Order::open(Uuid::new_v4(), Utc::now());
        order.details.push(detail(order.id, "Chess", dec!(20.00), 1, dec!(0)));
        order.details.push(detail(order.id, "Go", dec!(10.00), 3, dec!(0.1)));

        assert_eq!(order.details_total(), dec!(47.00));
    }

    #[test]
    fn active_statuses_are_open_and_checkout() {
        assert!(OrderStatus::Open.is_active());
        assert!(OrderStatus::Checkout.is_active());
        assert!(!OrderStatus::Paid.is_active());
        assert!(!OrderStatus::Cancelled.is_active());
        assert!(!OrderStatus::Shipped.is_active());
    }

    #[test]
    fn terminal_states_have_no_exits() {
        use OrderStatus::*;
        for from in [Shipped, Cancelled] {
            for to in [Open, Checkout, Paid, Shipped, Cancelled] {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be illegal");
            }
        }
    }

    #[test]
    fn shipping_requires_paid() {
        let now = Utc::now();
        let mut order = Order::open(Uuid::new_v4(), now);

        let err = order.transition(OrderStatus::Shipped, now).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition { from: OrderStatus::Open, to: OrderStatus::Shipped }
        ));

        order.transition(OrderStatus::Paid, now).unwrap();
        assert_eq!(order.paid_date, Some(now));
        order.transition(OrderStatus::Shipped, now).unwrap();
        assert_eq!(order.shipped_date, Some(now));
    }

    #[test]
    fn checkout_order_is_not_a_mutable_cart() {
        let now = Utc::now();
        let mut order = Order::open(Uuid::new_v4(), now);
        assert!(order.ensure_mutable().is_ok());
        order.transition(OrderStatus::Checkout, now).unwrap();
        assert!(order.ensure_mutable().is_err());
    }

    #[test]
    fn notification_type_parsing_is_case_insensitive() {
        assert_eq!("EMAIL".parse::<NotificationType>(), Ok(NotificationType::Email));
        assert_eq!(" Sms ".parse::<NotificationType>(), Ok(NotificationType::Sms));
        assert_eq!("push".parse::<NotificationType>(), Ok(NotificationType::Push));
        assert!("carrier-pigeon".parse::<NotificationType>().is_err());
    }
}

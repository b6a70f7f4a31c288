use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{NotificationType, Order};

/// Payload handed to the publisher. The `type` tag is the transport's
/// routing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NotificationMessage {
    Email {
        customer_id: Uuid,
        order_id: Uuid,
        subject: String,
        html_body: String,
    },
    Sms {
        customer_id: Uuid,
        order_id: Uuid,
        phone: String,
        text: String,
    },
    Push {
        customer_id: Uuid,
        order_id: Uuid,
        title: String,
        text: String,
    },
}

impl NotificationMessage {
    pub fn kind(&self) -> NotificationType {
        match self {
            NotificationMessage::Email { .. } => NotificationType::Email,
            NotificationMessage::Sms { .. } => NotificationType::Sms,
            NotificationMessage::Push { .. } => NotificationType::Push,
        }
    }

    pub fn order_id(&self) -> Uuid {
        match self {
            NotificationMessage::Email { order_id, .. }
            | NotificationMessage::Sms { order_id, .. }
            | NotificationMessage::Push { order_id, .. } => *order_id,
        }
    }
}

/// Line items flattened into positional lists: the Nth name goes with the
/// Nth quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub order_id: Uuid,
    pub item_names: String,
    pub quantities: String,
    pub sum: Decimal,
}

impl OrderSummary {
    pub fn from_order(order: &Order) -> Self {
        let item_names = order
            .details
            .iter()
            .map(|d| d.product_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let quantities = order
            .details
            .iter()
            .map(|d| d.quantity.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            order_id: order.id,
            item_names,
            quantities,
            sum: order.sum,
        }
    }
}

pub fn email(order: &Order, image_base_url: &str) -> NotificationMessage {
    let summary = OrderSummary::from_order(order);
    let base = image_base_url.trim_end_matches('/');
    let thumbnails: String = order
        .details
        .iter()
        .map(|d| {
            format!(
                r#"<img src="{base}/{}" alt="{}" width="64" height="64"/>"#,
                d.product_id,
                escape_html(&d.product_name)
            )
        })
        .collect();

    let html_body = format!(
        "<html><body>\
         <h2>Thank you for your order!</h2>\
         <div>{thumbnails}</div>\
         <p>Order: {order_id}</p>\
         <p>Items: {items}</p>\
         <p>Quantities: {quantities}</p>\
         <p>Total: {sum}</p>\
         </body></html>",
        order_id = summary.order_id,
        items = escape_html(&summary.item_names),
        quantities = summary.quantities,
        sum = summary.sum,
    );

    NotificationMessage::Email {
        customer_id: order.customer_id,
        order_id: order.id,
        subject: format!("Order {} confirmed", order.id),
        html_body,
    }
}

pub fn sms(order: &Order, phone: &str) -> NotificationMessage {
    let summary = OrderSummary::from_order(order);
    NotificationMessage::Sms {
        customer_id: order.customer_id,
        order_id: order.id,
        phone: phone.to_string(),
        text: format!(
            "Order {} confirmed. Items: {}. Quantities: {}.",
            summary.order_id, summary.item_names, summary.quantities
        ),
    }
}

pub fn push(order: &Order) -> NotificationMessage {
    let summary = OrderSummary::from_order(order);
    NotificationMessage::Push {
        customer_id: order.customer_id,
        order_id: order.id,
        title: "Order confirmed".to_string(),
        text: format!(
            "Order {}: {} ({})",
            summary.order_id, summary.item_names, summary.quantities
        ),
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderDetails, OrderStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn chess_and_go() -> Order {
        let mut order = Order::open(Uuid::new_v4(), Utc::now());
        for (name, quantity, price) in [("Chess", 1, dec!(20.00)), ("Go", 3, dec!(15.50))] {
            order.details.push(OrderDetails {
                id: Uuid::new_v4(),
                order_id: order.id,
                product_id: Uuid::new_v4(),
                product_name: name.into(),
                price,
                quantity,
                discount: dec!(0),
                creation_date: Utc::now(),
            });
        }
        order.sum = order.details_total();
        order.status = OrderStatus::Paid;
        order
    }

    #[test]
    fn email_lists_items_quantities_order_and_sum() {
        let order = chess_and_go();
        let NotificationMessage::Email { html_body, .. } = email(&order, "http://img/") else {
            panic!("expected email payload");
        };

        assert!(html_body.contains("Items: Chess, Go"));
        assert!(html_body.contains("Quantities: 1, 3"));
        assert!(html_body.contains(&order.id.to_string()));
        assert!(html_body.contains("66.50"));
        for detail in &order.details {
            assert!(html_body.contains(&format!("http://img/{}", detail.product_id)));
        }
    }

    #[test]
    fn sms_carries_phone_and_positional_lists() {
        let order = chess_and_go();
        let message = sms(&order, "+15550100");
        let NotificationMessage::Sms { phone, text, .. } = &message else {
            panic!("expected sms payload");
        };
        assert_eq!(phone, "+15550100");
        assert!(text.contains("Items: Chess, Go. Quantities: 1, 3."));
        assert_eq!(message.kind(), NotificationType::Sms);
    }

    #[test]
    fn payload_is_tagged_by_channel() {
        let order = chess_and_go();
        let json = serde_json::to_value(push(&order)).unwrap();
        assert_eq!(json["type"], "push");
        assert_eq!(json["order_id"], order.id.to_string());
    }

    #[test]
    fn product_names_are_escaped_in_html() {
        let mut order = chess_and_go();
        order.details[0].product_name = "<Chess & Co>".into();
        let NotificationMessage::Email { html_body, .. } = email(&order, "http://img") else {
            panic!("expected email payload");
        };
        assert!(html_body.contains("&lt;Chess &amp; Co&gt;"));
        assert!(!html_body.contains("<Chess"));
    }
}

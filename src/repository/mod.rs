//! Storage ports used by the services.
//!
//! Each port has a Postgres adapter and an in-memory adapter; services only
//! ever see the trait objects held in [`crate::state::AppState`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Order, OrderStatus},
};

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryNotificationPreferences, InMemoryOrderRepository, InMemoryProductCatalog};
pub use postgres::{PgNotificationPreferences, PgOrderRepository, PgProductCatalog};

#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub newest_first: bool,
    pub limit: u64,
    pub offset: u64,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// The customer's `Open` or `Checkout` order, if any.
    async fn active_order(&self, customer_id: Uuid) -> AppResult<Option<Order>>;

    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<Order>>;

    /// Orders owned by the customer plus the unpaged total.
    async fn list_orders(&self, customer_id: Uuid, filter: &OrderFilter) -> AppResult<(Vec<Order>, u64)>;

    /// Insert or replace an `Open` cart together with its details.
    async fn save_cart(&self, order: &Order) -> AppResult<()>;

    async fn begin(&self) -> AppResult<Box<dyn OrderTransaction>>;
}

/// A unit of work around order status writes.
///
/// Status changes are compare-and-swap: the write only lands if the order is
/// still in one of the `expected` statuses, otherwise `StatusConflict`.
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait OrderTransaction: Send {
    async fn transition(
        &mut self,
        order_id: Uuid,
        expected: &[OrderStatus],
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;

    async fn checkout_order(&mut self, order_id: Uuid) -> AppResult<()> {
        self.transition(order_id, &[OrderStatus::Open], OrderStatus::Checkout, Utc::now())
            .await
    }

    async fn complete_order(&mut self, order_id: Uuid) -> AppResult<()> {
        self.transition(order_id, &OrderStatus::ACTIVE, OrderStatus::Paid, Utc::now())
            .await
    }

    async fn cancel_order(&mut self, order_id: Uuid) -> AppResult<()> {
        self.transition(order_id, &OrderStatus::ACTIVE, OrderStatus::Cancelled, Utc::now())
            .await
    }

    async fn ship_order(&mut self, order_id: Uuid) -> AppResult<()> {
        self.transition(order_id, &[OrderStatus::Paid], OrderStatus::Shipped, Utc::now())
            .await
    }
}

/// Price snapshot of a catalog product at add-to-cart time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub discount: Decimal,
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn product(&self, product_id: Uuid) -> AppResult<Option<ProductSnapshot>>;
}

#[async_trait]
pub trait NotificationPreferences: Send + Sync {
    /// The raw stored channel name; `None` when the customer never chose one.
    async fn notification_type(&self, customer_id: Uuid) -> AppResult<Option<String>>;
}

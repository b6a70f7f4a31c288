use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Order, OrderStatus},
};

use super::{
    NotificationPreferences, OrderFilter, OrderRepository, OrderTransaction, ProductCatalog,
    ProductSnapshot,
};

type OrderMap = Arc<RwLock<HashMap<Uuid, Order>>>;

/// A thread-safe in-memory order store.
///
/// Transactions stage their writes and apply them on commit, re-checking
/// that no other writer moved an order in the meantime.
#[derive(Default, Clone)]
pub struct InMemoryOrderRepository {
    orders: OrderMap,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite an order regardless of its status.
    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id, order);
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn active_order(&self, customer_id: Uuid) -> AppResult<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| o.customer_id == customer_id && o.status.is_active())
            .cloned())
    }

    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn list_orders(&self, customer_id: Uuid, filter: &OrderFilter) -> AppResult<(Vec<Order>, u64)> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        matching.sort_by_key(|o| o.order_date);
        if filter.newest_first {
            matching.reverse();
        }

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn save_cart(&self, order: &Order) -> AppResult<()> {
        let mut orders = self.orders.write().await;
        if let Some(existing) = orders.get(&order.id) {
            if existing.status != OrderStatus::Open {
                return Err(AppError::StatusConflict(order.id));
            }
        } else if orders
            .values()
            .any(|o| o.customer_id == order.customer_id && o.status.is_active())
        {
            return Err(AppError::BadRequest(
                "customer already has an active order".into(),
            ));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn begin(&self) -> AppResult<Box<dyn OrderTransaction>> {
        Ok(Box::new(InMemoryOrderTransaction {
            orders: self.orders.clone(),
            staged: HashMap::new(),
        }))
    }
}

pub struct InMemoryOrderTransaction {
    orders: OrderMap,
    // order id -> (status observed before the first write, staged order)
    staged: HashMap<Uuid, (OrderStatus, Order)>,
}

#[async_trait]
impl OrderTransaction for InMemoryOrderTransaction {
    async fn transition(
        &mut self,
        order_id: Uuid,
        expected: &[OrderStatus],
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let (observed, mut order) = match self.staged.get(&order_id) {
            Some((observed, order)) => (*observed, order.clone()),
            None => {
                let order = self
                    .orders
                    .read()
                    .await
                    .get(&order_id)
                    .cloned()
                    .ok_or(AppError::StatusConflict(order_id))?;
                (order.status, order)
            }
        };

        if !expected.contains(&order.status) {
            return Err(AppError::StatusConflict(order_id));
        }
        order.transition(next, at)?;
        self.staged.insert(order_id, (observed, order));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Self { orders, staged } = *self;
        let mut orders = orders.write().await;
        for (id, (observed, _)) in &staged {
            if orders.get(id).map(|o| o.status) != Some(*observed) {
                return Err(AppError::StatusConflict(*id));
            }
        }
        for (id, (_, order)) in staged {
            orders.insert(id, order);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryProductCatalog {
    products: Arc<RwLock<HashMap<Uuid, ProductSnapshot>>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, product: ProductSnapshot) {
        self.products.write().await.insert(product.id, product);
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn product(&self, product_id: Uuid) -> AppResult<Option<ProductSnapshot>> {
        Ok(self.products.read().await.get(&product_id).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryNotificationPreferences {
    preferences: Arc<RwLock<HashMap<Uuid, String>>>,
}

impl InMemoryNotificationPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, customer_id: Uuid, kind: impl Into<String>) {
        self.preferences.write().await.insert(customer_id, kind.into());
    }
}

#[async_trait]
impl NotificationPreferences for InMemoryNotificationPreferences {
    async fn notification_type(&self, customer_id: Uuid) -> AppResult<Option<String>> {
        Ok(self.preferences.read().await.get(&customer_id).cloned())
    }
}

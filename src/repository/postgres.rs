use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
    sea_query::{Expr, LockType, OnConflict},
};
use uuid::Uuid;

use crate::{
    db::{DbPool, OrmConn},
    entity::{
        order_details::{
            ActiveModel as DetailActive, Column as DetailCol, Entity as OrderDetails,
            Model as DetailModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    models::{Order, OrderDetails as Detail, OrderStatus},
};

use super::{
    NotificationPreferences, OrderFilter, OrderRepository, OrderTransaction, ProductCatalog,
    ProductSnapshot,
};

#[derive(Clone)]
pub struct PgOrderRepository {
    orm: OrmConn,
}

impl PgOrderRepository {
    pub fn new(orm: OrmConn) -> Self {
        Self { orm }
    }

    async fn load_details(&self, order_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<Detail>>> {
        let mut grouped: HashMap<Uuid, Vec<Detail>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }
        let rows = OrderDetails::find()
            .filter(DetailCol::OrderId.is_in(order_ids.iter().copied()))
            .order_by_asc(DetailCol::CreationDate)
            .all(&self.orm)
            .await?;
        for row in rows {
            grouped
                .entry(row.order_id)
                .or_default()
                .push(detail_from_entity(row));
        }
        Ok(grouped)
    }

    async fn with_details(&self, model: Option<OrderModel>) -> AppResult<Option<Order>> {
        let Some(model) = model else {
            return Ok(None);
        };
        let mut details = self.load_details(&[model.id]).await?;
        let items = details.remove(&model.id).unwrap_or_default();
        order_from_entity(model, items).map(Some)
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn active_order(&self, customer_id: Uuid) -> AppResult<Option<Order>> {
        let model = Orders::find()
            .filter(
                Condition::all()
                    .add(OrderCol::CustomerId.eq(customer_id))
                    .add(OrderCol::Status.is_in(OrderStatus::ACTIVE.iter().map(|s| s.as_str()))),
            )
            .one(&self.orm)
            .await?;
        self.with_details(model).await
    }

    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        let model = Orders::find_by_id(order_id).one(&self.orm).await?;
        self.with_details(model).await
    }

    async fn list_orders(&self, customer_id: Uuid, filter: &OrderFilter) -> AppResult<(Vec<Order>, u64)> {
        let mut condition = Condition::all().add(OrderCol::CustomerId.eq(customer_id));
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status.as_str()));
        }

        let mut finder = Orders::find().filter(condition);
        finder = if filter.newest_first {
            finder.order_by_desc(OrderCol::OrderDate)
        } else {
            finder.order_by_asc(OrderCol::OrderDate)
        };

        let total = finder.clone().count(&self.orm).await?;
        let models = finder
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.orm)
            .await?;

        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let mut details = self.load_details(&ids).await?;
        let orders = models
            .into_iter()
            .map(|m| {
                let items = details.remove(&m.id).unwrap_or_default();
                order_from_entity(m, items)
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok((orders, total))
    }

    async fn save_cart(&self, order: &Order) -> AppResult<()> {
        let txn = self.orm.begin().await?;

        let existing = Orders::find_by_id(order.id)
            .lock(LockType::Update)
            .one(&txn)
            .await?;

        match existing {
            Some(model) => {
                if model.status != OrderStatus::Open.as_str() {
                    return Err(AppError::StatusConflict(order.id));
                }
                let mut active: OrderActive = model.into();
                active.sum = Set(order.sum);
                active.update(&txn).await?;
            }
            None => {
                OrderActive {
                    id: Set(order.id),
                    customer_id: Set(order.customer_id),
                    order_date: Set(order.order_date.fixed_offset()),
                    required_date: Set(order.required_date.map(|d| d.fixed_offset())),
                    shipped_date: Set(None),
                    paid_date: Set(None),
                    status: Set(OrderStatus::Open.as_str().to_string()),
                    sum: Set(order.sum),
                }
                .insert(&txn)
                .await
                .map_err(new_cart_error)?;
            }
        }

        let kept: Vec<Uuid> = order.details.iter().map(|d| d.product_id).collect();
        OrderDetails::delete_many()
            .filter(DetailCol::OrderId.eq(order.id))
            .filter(DetailCol::ProductId.is_not_in(kept))
            .exec(&txn)
            .await?;

        for detail in &order.details {
            OrderDetails::insert(DetailActive {
                id: Set(detail.id),
                order_id: Set(order.id),
                product_id: Set(detail.product_id),
                product_name: Set(detail.product_name.clone()),
                price: Set(detail.price),
                quantity: Set(detail.quantity),
                discount: Set(detail.discount),
                creation_date: Set(detail.creation_date.fixed_offset()),
            })
            .on_conflict(
                OnConflict::columns([DetailCol::OrderId, DetailCol::ProductId])
                    .update_column(DetailCol::Quantity)
                    .to_owned(),
            )
            .exec(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn begin(&self) -> AppResult<Box<dyn OrderTransaction>> {
        let txn = self.orm.begin().await?;
        Ok(Box::new(PgOrderTransaction { txn }))
    }
}

pub struct PgOrderTransaction {
    txn: DatabaseTransaction,
}

#[async_trait]
impl OrderTransaction for PgOrderTransaction {
    async fn transition(
        &mut self,
        order_id: Uuid,
        expected: &[OrderStatus],
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut update = Orders::update_many()
            .col_expr(OrderCol::Status, Expr::value(next.as_str()))
            .filter(OrderCol::Id.eq(order_id))
            .filter(OrderCol::Status.is_in(expected.iter().map(|s| s.as_str())));
        update = match next {
            OrderStatus::Paid => update.col_expr(OrderCol::PaidDate, Expr::value(at.fixed_offset())),
            OrderStatus::Shipped => {
                update.col_expr(OrderCol::ShippedDate, Expr::value(at.fixed_offset()))
            }
            _ => update,
        };

        let result = update.exec(&self.txn).await?;
        if result.rows_affected == 0 {
            return Err(AppError::StatusConflict(order_id));
        }
        tracing::debug!(order_id = %order_id, status = %next, "order status staged");
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.txn.rollback().await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgProductCatalog {
    pool: DbPool,
}

impl PgProductCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn product(&self, product_id: Uuid) -> AppResult<Option<ProductSnapshot>> {
        let row: Option<(Uuid, String, Decimal, Decimal)> =
            sqlx::query_as("SELECT id, name, price, discount FROM products WHERE id = $1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, name, price, discount)| ProductSnapshot {
            id,
            name,
            price,
            discount,
        }))
    }
}

#[derive(Clone)]
pub struct PgNotificationPreferences {
    pool: DbPool,
}

impl PgNotificationPreferences {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationPreferences for PgNotificationPreferences {
    async fn notification_type(&self, customer_id: Uuid) -> AppResult<Option<String>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT notification_type FROM users WHERE id = $1")
                .bind(customer_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.and_then(|(kind,)| kind))
    }
}

/// Two first adds racing for the same customer trip `orders_one_active_per_customer`.
fn new_cart_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::BadRequest("customer already has an active order".into())
        }
        _ => AppError::OrmError(err),
    }
}

fn order_from_entity(model: OrderModel, details: Vec<Detail>) -> AppResult<Order> {
    Ok(Order {
        id: model.id,
        customer_id: model.customer_id,
        order_date: model.order_date.with_timezone(&Utc),
        required_date: model.required_date.map(|dt| dt.with_timezone(&Utc)),
        shipped_date: model.shipped_date.map(|dt| dt.with_timezone(&Utc)),
        paid_date: model.paid_date.map(|dt| dt.with_timezone(&Utc)),
        status: model.status.parse()?,
        sum: model.sum,
        details,
    })
}

fn detail_from_entity(model: DetailModel) -> Detail {
    Detail {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        price: model.price,
        quantity: model.quantity,
        discount: model.discount,
        creation_date: model.creation_date.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_insert_failures_stay_database_errors() {
        let err = new_cart_error(DbErr::Custom("connection lost".into()));
        assert!(matches!(err, AppError::OrmError(_)));
    }
}

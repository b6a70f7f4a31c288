use uuid::Uuid;

use crate::{
    dto::orders::OrderList,
    error::{AppError, AppResult},
    models::{Order, OrderStatus},
    repository::OrderFilter,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    customer_id: Uuid,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let filter = OrderFilter {
        status: query.status,
        newest_first: matches!(query.sort_order.unwrap_or(SortOrder::Desc), SortOrder::Desc),
        limit: limit as u64,
        offset: offset as u64,
    };

    let (items, total) = state.orders.list_orders(customer_id, &filter).await?;

    let meta = Meta::new(page, limit, total as i64);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    customer_id: Uuid,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = match state.orders.find_order(id).await? {
        Some(o) if o.customer_id == customer_id => o,
        _ => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}

/// Fulfillment: `Paid -> Shipped`.
pub async fn ship_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Order>> {
    let mut order = state
        .orders
        .find_order(id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !order.status.can_transition_to(OrderStatus::Shipped) {
        return Err(AppError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Shipped,
        });
    }

    let mut txn = state.orders.begin().await?;
    if let Err(err) = txn.ship_order(order.id).await {
        txn.rollback().await?;
        return Err(err);
    }
    txn.commit().await?;

    order.transition(OrderStatus::Shipped, chrono::Utc::now())?;
    tracing::info!(order_id = %order.id, "order shipped");

    Ok(ApiResponse::success("Order shipped", order, Some(Meta::empty())))
}

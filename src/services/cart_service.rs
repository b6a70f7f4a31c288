use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::cart::AddToCartRequest,
    error::{AppError, AppResult},
    models::{Order, OrderDetails},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn view_cart(state: &AppState, customer_id: Uuid) -> AppResult<ApiResponse<Order>> {
    let order = state
        .orders
        .active_order(customer_id)
        .await?
        .ok_or(AppError::NoActiveOrder)?;
    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}

/// Add a product to the customer's cart, opening a new cart if none exists.
/// Adding a product that is already in the cart replaces its quantity.
pub async fn add_to_cart(
    state: &AppState,
    customer_id: Uuid,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<Order>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product = state
        .catalog
        .product(payload.product_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("product not found".to_string()))?;

    let now = Utc::now();
    let mut order = match state.orders.active_order(customer_id).await? {
        Some(order) => {
            order.ensure_mutable()?;
            order
        }
        None => {
            tracing::debug!(customer_id = %customer_id, "opening new cart");
            Order::open(customer_id, now)
        }
    };

    match order
        .details
        .iter_mut()
        .find(|d| d.product_id == product.id)
    {
        Some(detail) => detail.quantity = payload.quantity,
        None => order.details.push(OrderDetails {
            id: Uuid::new_v4(),
            order_id: order.id,
            product_id: product.id,
            product_name: product.name,
            price: product.price,
            quantity: payload.quantity,
            discount: product.discount,
            creation_date: now,
        }),
    }
    order.sum = order.details_total();

    state.orders.save_cart(&order).await?;
    tracing::info!(
        customer_id = %customer_id,
        order_id = %order.id,
        product_id = %payload.product_id,
        quantity = payload.quantity,
        "cart updated"
    );

    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}

pub async fn remove_from_cart(
    state: &AppState,
    customer_id: Uuid,
    product_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let mut order = state
        .orders
        .active_order(customer_id)
        .await?
        .ok_or(AppError::NoActiveOrder)?;
    order.ensure_mutable()?;

    let before = order.details.len();
    order.details.retain(|d| d.product_id != product_id);
    if order.details.len() == before {
        return Err(AppError::NotFound);
    }
    order.sum = order.details_total();

    state.orders.save_cart(&order).await?;
    tracing::info!(customer_id = %customer_id, order_id = %order.id, product_id = %product_id, "removed from cart");

    Ok(ApiResponse::success(
        "Removed from cart",
        order,
        Some(Meta::empty()),
    ))
}

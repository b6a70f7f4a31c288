use axum::{
    Json, Router,
    extract::{Path, State},
    routing::patch,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::Order,
    response::ApiResponse,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/orders/{id}/ship", patch(ship_order))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/ship",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Mark a paid order as shipped", body = ApiResponse<Order>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Order is not Paid"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn ship_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    ensure_admin(&user)?;
    let resp = order_service::ship_order(&state, id).await?;
    Ok(Json(resp))
}

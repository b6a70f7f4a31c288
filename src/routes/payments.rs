use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::post,
};

use crate::{
    dto::payments::{CardPaymentRequest, CardPaymentResult, TerminalPaymentResult},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/card", post(pay_by_card))
        .route("/terminal", post(pay_by_terminal))
        .route("/bank", post(pay_by_bank))
}

#[utoipa::path(
    post,
    path = "/api/payments/card",
    request_body = CardPaymentRequest,
    responses(
        (status = 200, description = "Settle the active order by card; `paid` is false on decline", body = ApiResponse<CardPaymentResult>),
        (status = 400, description = "Invalid card details or empty order"),
        (status = 404, description = "No active order"),
        (status = 500, description = "Transaction aborted"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn pay_by_card(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CardPaymentRequest>,
) -> AppResult<Json<ApiResponse<CardPaymentResult>>> {
    let resp = payment_service::process_card_payment(&state, user.user_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/terminal",
    responses(
        (status = 200, description = "Settle the active order through the payment terminal", body = ApiResponse<TerminalPaymentResult>),
        (status = 404, description = "No active order"),
        (status = 500, description = "Transaction aborted"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn pay_by_terminal(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<TerminalPaymentResult>>> {
    let resp = payment_service::process_terminal_payment(&state, user.user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/bank",
    responses(
        (status = 200, description = "Check out the active order and download its bank invoice", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "No active order"),
        (status = 409, description = "Order already checked out"),
        (status = 500, description = "Transaction aborted"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn pay_by_bank(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let document = payment_service::process_bank_payment(&state, user.user_id).await?;
    let disposition = format!("attachment; filename=\"{}\"", document.filename);
    Ok((
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    ))
}

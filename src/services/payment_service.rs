//! Card, terminal and bank-invoice settlement.
//!
//! Every flow follows the same shape: load the customer's active order, talk
//! to the processor (or render the invoice) outside any transaction, write the
//! status change inside a short transaction, and only after commit send the
//! confirmation. A processor decline is a normal outcome, not an error.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    dto::payments::{CardPaymentRequest, CardPaymentResult, TerminalPaymentResult},
    error::{AppError, AppResult},
    invoice::{self, Invoice, InvoiceDocument},
    models::{Order, OrderStatus},
    processor::{CardTransaction, ProcessorOutcome, TerminalTransaction},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn process_card_payment(
    state: &AppState,
    customer_id: Uuid,
    payload: CardPaymentRequest,
) -> AppResult<ApiResponse<CardPaymentResult>> {
    let order = load_payable_order(state, customer_id).await?;
    payload.validate()?;

    let transaction = CardTransaction {
        holder_name: payload.holder_name,
        card_number: payload.card_number,
        expiry_month: payload.expiry_month,
        expiry_year: payload.expiry_year,
        cvv: payload.cvv,
        amount: order.sum,
    };
    let outcome = state.processor.card_transaction(&transaction).await;

    let paid = settle(state, order, outcome).await?;
    let message = if paid { "Payment accepted" } else { "Payment declined" };
    Ok(ApiResponse::success(
        message,
        CardPaymentResult { paid },
        Some(Meta::empty()),
    ))
}

pub async fn process_terminal_payment(
    state: &AppState,
    customer_id: Uuid,
) -> AppResult<ApiResponse<TerminalPaymentResult>> {
    let order = load_payable_order(state, customer_id).await?;

    let transaction = TerminalTransaction {
        amount: order.sum,
        account_number: state.payment.terminal_account_number.clone(),
        invoice_number: build_terminal_invoice_number(),
    };
    let outcome = state.processor.terminal_transaction(&transaction).await;

    let result = TerminalPaymentResult {
        order_id: order.id,
        customer_id: order.customer_id,
        sum: order.sum,
    };
    let paid = settle(state, order, outcome).await?;
    let message = if paid { "Payment accepted" } else { "Payment declined" };
    Ok(ApiResponse::success(message, result, Some(Meta::empty())))
}

pub async fn process_bank_payment(state: &AppState, customer_id: Uuid) -> AppResult<InvoiceDocument> {
    let mut order = load_payable_order(state, customer_id).await?;
    if !order.status.can_transition_to(OrderStatus::Checkout) {
        return Err(AppError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Checkout,
        });
    }

    let now = Utc::now();
    let document = invoice::render(&Invoice::for_order(&order), now);

    commit_transition(state, &order, OrderStatus::Checkout).await?;
    order.transition(OrderStatus::Checkout, now)?;
    tracing::info!(
        order_id = %order.id,
        customer_id = %customer_id,
        document_id = %document.document_id,
        "bank invoice issued"
    );

    notify(state, &order).await;
    Ok(document)
}

async fn load_payable_order(state: &AppState, customer_id: Uuid) -> AppResult<Order> {
    let order = state
        .orders
        .active_order(customer_id)
        .await?
        .ok_or(AppError::NoActiveOrder)?;
    if order.details.is_empty() || order.sum <= Decimal::ZERO {
        return Err(AppError::BadRequest("Order is empty".into()));
    }
    Ok(order)
}

/// Record the processor outcome: Paid on approval, Cancelled on decline.
/// Returns whether the order was paid.
async fn settle(state: &AppState, mut order: Order, outcome: ProcessorOutcome) -> AppResult<bool> {
    let next = match outcome {
        ProcessorOutcome::Approved => OrderStatus::Paid,
        ProcessorOutcome::Declined => OrderStatus::Cancelled,
    };

    if let Err(err) = commit_transition(state, &order, next).await {
        if outcome.is_approved() {
            tracing::error!(
                order_id = %order.id,
                customer_id = %order.customer_id,
                sum = %order.sum,
                "processor captured funds but the order could not be marked Paid; reconcile manually"
            );
        }
        return Err(err);
    }

    order.transition(next, Utc::now())?;
    tracing::info!(order_id = %order.id, customer_id = %order.customer_id, status = %next, "order settled");

    if outcome.is_approved() {
        notify(state, &order).await;
    }
    Ok(outcome.is_approved())
}

/// Write one status transition in its own transaction scope. Any failure
/// rolls the scope back and surfaces as `TransactionAborted`.
async fn commit_transition(state: &AppState, order: &Order, next: OrderStatus) -> AppResult<()> {
    let mut txn = state.orders.begin().await.map_err(|err| aborted(order, err))?;

    let staged = match next {
        OrderStatus::Paid => txn.complete_order(order.id).await,
        OrderStatus::Cancelled => txn.cancel_order(order.id).await,
        OrderStatus::Checkout => txn.checkout_order(order.id).await,
        other => Err(AppError::InvalidTransition {
            from: order.status,
            to: other,
        }),
    };

    if let Err(err) = staged {
        if let Err(rollback_err) = txn.rollback().await {
            tracing::warn!(order_id = %order.id, error = %rollback_err, "rollback failed");
        }
        return Err(aborted(order, err));
    }

    txn.commit().await.map_err(|err| aborted(order, err))
}

fn aborted(order: &Order, err: AppError) -> AppError {
    tracing::error!(order_id = %order.id, error = %err, "settlement transaction aborted");
    AppError::TransactionAborted(format!("order {}: {err}", order.id))
}

/// Failures are logged and never propagate into the settlement result.
async fn notify(state: &AppState, order: &Order) {
    if let Err(err) = state
        .notifier
        .generate_notification(order.customer_id, order)
        .await
    {
        tracing::error!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            error = %err,
            "order notification failed"
        );
    }
}

fn build_terminal_invoice_number() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("TRM-{}-{}", date, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_invoice_numbers_are_unique_and_dated() {
        let first = build_terminal_invoice_number();
        let second = build_terminal_invoice_number();
        assert_ne!(first, second);
        assert!(first.starts_with(&format!("TRM-{}-", Utc::now().format("%Y%m%d"))));
        assert_eq!(first.len(), "TRM-YYYYMMDD-".len() + 8);
    }
}

use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::AddToCartRequest,
        orders::OrderList,
        payments::{CardPaymentRequest, CardPaymentResult, TerminalPaymentResult},
    },
    models::{NotificationType, Order, OrderDetails, OrderStatus},
    response::{ApiResponse, Meta},
    routes::{admin, cart, health, orders, params, payments},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::view_cart,
        cart::add_to_cart,
        cart::remove_from_cart,
        orders::list_orders,
        orders::get_order,
        payments::pay_by_card,
        payments::pay_by_terminal,
        payments::pay_by_bank,
        admin::ship_order
    ),
    components(
        schemas(
            Order,
            OrderDetails,
            OrderStatus,
            NotificationType,
            OrderList,
            AddToCartRequest,
            CardPaymentRequest,
            CardPaymentResult,
            TerminalPaymentResult,
            params::Pagination,
            params::OrderListQuery,
            params::SortOrder,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<CardPaymentResult>,
            ApiResponse<TerminalPaymentResult>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "The customer's open order"),
        (name = "Orders", description = "Order history and details"),
        (name = "Payments", description = "Card, terminal and bank-invoice settlement"),
        (name = "Admin", description = "Fulfillment endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_payment_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in ["/api/payments/card", "/api/payments/terminal", "/api/payments/bank"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}

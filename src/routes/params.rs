use serde::Deserialize;
use utoipa::ToSchema;

use crate::models::OrderStatus;

#[derive(Debug, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Query string of the order history. Paging fields are spelled out rather
/// than flattened: urlencoded numbers do not survive `serde(flatten)`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<OrderStatus>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination { page: Some(0), per_page: Some(500) };
        assert_eq!(p.normalize(), (1, 100, 0));

        let p = Pagination { page: Some(3), per_page: None };
        assert_eq!(p.normalize(), (3, 20, 40));

        let p = Pagination { page: Some(i64::MAX), per_page: Some(100) };
        assert_eq!(p.normalize(), (i64::MAX, 100, i64::MAX));
    }

    #[test]
    fn order_query_parses_from_query_string() {
        let uri: axum::http::Uri = "/orders?page=2&per_page=5&status=Paid&sort_order=asc"
            .parse()
            .unwrap();
        let axum::extract::Query(query) =
            axum::extract::Query::<OrderListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.pagination().normalize(), (2, 5, 5));
        assert_eq!(query.status, Some(OrderStatus::Paid));
        assert!(matches!(query.sort_order, Some(SortOrder::Asc)));
    }
}

use serde::Deserialize;
use utoipa::ToSchema;

use crate::order_status::OrderStatus;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Highest page a client may ask for; keeps `offset` far from overflow.
pub const MAX_PAGE: i64 = 1_000_000;

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

// Pagination fields are spelled out: `serde(flatten)` breaks numeric fields
// under the urlencoded deserializer.
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
        let p = Pagination {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(p.normalize(), (1, 100, 0));

        let p = Pagination {
            page: Some(3),
            per_page: None,
        };
        assert_eq!(p.normalize(), (3, 20, 40));
    }

    #[test]
    fn huge_page_is_capped_instead_of_overflowing() {
        let query: OrderListQuery =
            serde_json::from_value(serde_json::json!({ "page": i64::MAX, "per_page": 100 }))
                .expect("query");
        let (page, per_page, offset) = query.pagination().normalize();
        assert_eq!(page, MAX_PAGE);
        assert_eq!(per_page, 100);
        assert_eq!(offset, (MAX_PAGE - 1) * 100);
        assert!(offset >= 0);
    }

    #[test]
    fn order_query_fills_in_pagination_defaults() {
        let query: OrderListQuery =
            serde_json::from_value(serde_json::json!({ "page": 2, "status": "ready" }))
                .expect("query");
        assert_eq!(query.pagination().normalize(), (2, 20, 20));
        assert_eq!(query.status, Some(OrderStatus::Ready));
        assert!(query.sort_order.is_none());
    }
}

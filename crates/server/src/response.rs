//! JSON response envelope and list query parameters.
//!
//! Every response body has the shape
//! `{ "success": bool, "message"?: string, "data"?: T, "error"?: string }`;
//! list responses add `pagination`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Default page size.
pub const DEFAULT_LIMIT: i64 = 20;

/// Largest page size a client may request.
pub const MAX_LIMIT: i64 = 100;

/// Successful response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    status: StatusCode,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    /// `200 OK` with data.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: None,
            data: Some(data),
            pagination: None,
        }
    }

    /// `201 Created` with data.
    #[must_use]
    pub const fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            success: true,
            message: None,
            data: Some(data),
            pagination: None,
        }
    }

    /// Attach a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// `200 OK` with only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: Some(message.into()),
            data: None,
            pagination: None,
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// `200 OK` with one page of a list.
    #[must_use]
    pub fn page(items: Vec<T>, total: i64, query: &ListQuery) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: None,
            data: Some(items),
            pagination: Some(Pagination::new(query.page(), query.limit(), total)),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Pagination block of list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    #[must_use]
    pub const fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Common list query parameters: `page`, `limit`, `search`, `sortBy`, `sortOrder`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl ListQuery {
    /// 1-based page number.
    #[must_use]
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Trimmed search term, if any.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// SQL column for `sortBy`, restricted to `allowed`.
    #[must_use]
    pub fn sort_column(
        &self,
        allowed: &[(&'static str, &'static str)],
        default: &'static str,
    ) -> &'static str {
        self.sort_by
            .as_deref()
            .and_then(|key| allowed.iter().find(|(k, _)| *k == key))
            .map_or(default, |(_, column)| *column)
    }

    /// `ASC` or `DESC`.
    #[must_use]
    pub fn sort_direction(&self) -> &'static str {
        match self.sort_order.unwrap_or_default() {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let q = ListQuery::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 20);
        assert_eq!(q.offset(), 0);
        assert_eq!(q.search(), None);
        assert_eq!(q.sort_direction(), "DESC");
    }

    #[test]
    fn test_list_query_clamps() {
        let q = ListQuery {
            page: Some(0),
            limit: Some(500),
            ..ListQuery::default()
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 100);

        let q = ListQuery {
            page: Some(3),
            limit: Some(10),
            ..ListQuery::default()
        };
        assert_eq!(q.offset(), 20);
    }

    #[test]
    fn test_sort_column_whitelist() {
        let allowed = [("name", "name"), ("createdAt", "created_at")];
        let q = ListQuery {
            sort_by: Some("createdAt".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(q.sort_column(&allowed, "id"), "created_at");

        let q = ListQuery {
            sort_by: Some("password_hash; DROP TABLE".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(q.sort_column(&allowed, "id"), "id");
    }

    #[test]
    fn test_pagination_total_pages() {
        assert_eq!(Pagination::new(1, 20, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 20, 20).total_pages, 1);
        assert_eq!(Pagination::new(1, 20, 21).total_pages, 2);
    }

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "data": [1, 2] }));

        let query = ListQuery::default();
        let json = serde_json::to_value(ApiResponse::page(vec!["a"], 41, &query)).unwrap();
        assert_eq!(
            json["pagination"],
            serde_json::json!({ "page": 1, "limit": 20, "total": 41, "totalPages": 3 })
        );
    }

    #[test]
    fn test_query_string_parsing() {
        let q: ListQuery =
            serde_json::from_value(serde_json::json!({ "sortBy": "name", "sortOrder": "asc" }))
                .unwrap();
        assert_eq!(q.sort_by.as_deref(), Some("name"));
        assert_eq!(q.sort_direction(), "ASC");
    }
}

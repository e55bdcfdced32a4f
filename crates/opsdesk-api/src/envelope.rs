//! The JSON envelope every endpoint responds with.
//!
//! Success bodies look like
//! `{ "success": true, "data": ..., "count"?, "total"?, "pagination"?, "message"? }`;
//! error bodies are produced by [`crate::error::ApiError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use opsdesk_core::{PageRequest, Pagination};
use serde::Serialize;

/// Successful response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    /// Always `true`; failures go through [`crate::error::ApiError`].
    pub success: bool,
    /// Payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Number of items in `data` for list responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Number of matching documents across all pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Page metadata for paginated lists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    /// Human-readable note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// A single payload.
    pub const fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            count: None,
            total: None,
            pagination: None,
            message: None,
        }
    }

    /// Attach a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Respond with `201 Created` instead of `200 OK`.
    pub const fn created(self) -> Created<T> {
        Created(self)
    }
}

impl<T> Envelope<Vec<T>> {
    /// An unpaginated list.
    pub fn list(items: Vec<T>) -> Self {
        let count = u64::try_from(items.len()).unwrap_or(u64::MAX);
        Self {
            count: Some(count),
            ..Self::data(items)
        }
    }

    /// One page of a list of `total` matches.
    pub fn page(items: Vec<T>, total: u64, page: &PageRequest) -> Self {
        Self {
            total: Some(total),
            pagination: Some(page.pagination(total)),
            ..Self::list(items)
        }
    }
}

impl Envelope<()> {
    /// A body with only a message, used by deletes.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            count: None,
            total: None,
            pagination: None,
            message: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// An [`Envelope`] sent with `201 Created`.
#[derive(Debug, Clone)]
pub struct Created<T>(pub Envelope<T>);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use opsdesk_core::config::PaginationConfig;
    use serde_json::json;

    use super::*;

    #[test]
    fn page_envelope_carries_counts() {
        let page = PageRequest::new(Some(2), Some(5), &PaginationConfig::default());
        let envelope = Envelope::page(vec![1, 2, 3, 4, 5], 15, &page);
        let json = serde_json::to_value(&envelope).unwrap_or_default();
        assert_eq!(
            json,
            json!({
                "success": true,
                "data": [1, 2, 3, 4, 5],
                "count": 5,
                "total": 15,
                "pagination": { "page": 2, "limit": 5, "totalPages": 3 }
            })
        );
    }

    #[test]
    fn message_envelope_has_no_data() {
        let json = serde_json::to_value(Envelope::message("Task deleted")).unwrap_or_default();
        assert_eq!(json, json!({ "success": true, "message": "Task deleted" }));
    }
}

//! Error types for the API layer.
//!
//! [`ApiError`] unifies all failure modes into a single enum that converts
//! into the error envelope `{ "success": false, "message": ..., "errors"? }`
//! via its [`IntoResponse`] implementation. Storage and hashing failures
//! are logged and reported to the client as a bare `Server Error`.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use opsdesk_core::{AuthError, GraphError, StockError};
use opsdesk_db::DbError;
use validator::ValidationErrors;

/// Message sent for every 500 response.
const SERVER_ERROR: &str = "Server Error";

/// Errors that can occur while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body fields failed validation.
    #[error("validation failed: {message}")]
    Validation {
        /// Combined message.
        message: String,
        /// Message per offending field (camelCase).
        fields: BTreeMap<String, String>,
    },

    /// The request is malformed or violates a business rule.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing, invalid, or expired credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to do this.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The document store failed.
    #[error("database error: {0}")]
    Database(#[from] DbError),

    /// Password hashing or token signing failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// `404` for a missing document of the given kind.
    pub fn not_found(kind: &str, id: impl core::fmt::Display) -> Self {
        Self::NotFound(format!("{kind} not found with id of {id}"))
    }

    /// `403` for an action the caller's role does not permit.
    pub fn forbidden(action: &str) -> Self {
        Self::Forbidden(format!("Not authorized to {action}"))
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let fields: BTreeMap<String, String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let name = camel_case(&field);
                let message = errors
                    .iter()
                    .find_map(|e| e.message.as_ref().map(ToString::to_string))
                    .unwrap_or_else(|| format!("Invalid value for {name}"));
                (name, message)
            })
            .collect();
        let message = fields.values().cloned().collect::<Vec<_>>().join(", ");
        Self::Validation { message, fields }
    }
}

impl From<StockError> for ApiError {
    fn from(error: StockError) -> Self {
        Self::BadRequest(error.to_string())
    }
}

impl From<GraphError> for ApiError {
    fn from(error: GraphError) -> Self {
        Self::BadRequest(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation { message, .. } | Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Database(_) | Self::Auth(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR.to_owned())
            }
        };

        let mut body = serde_json::json!({
            "success": false,
            "message": message,
        });
        if let (Self::Validation { fields, .. }, Some(object)) = (&self, body.as_object_mut()) {
            object.insert(String::from("errors"), serde_json::json!(fields));
        }

        (status, axum::Json(body)).into_response()
    }
}

/// `due_date` -> `dueDate`, matching the wire names of request fields.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;
    use validator::Validate;

    use super::*;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "Please add a title"))]
        title: String,
        #[validate(range(min = 1, max = 5))]
        supplier_rating: u8,
    }

    async fn body_of(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn camel_cases_snake_fields() {
        assert_eq!(camel_case("due_date"), "dueDate");
        assert_eq!(camel_case("reorder_point_x"), "reorderPointX");
        assert_eq!(camel_case("title"), "title");
    }

    #[tokio::test]
    async fn validation_errors_list_fields() {
        let sample = Sample {
            title: String::new(),
            supplier_rating: 9,
        };
        let error = ApiError::from(sample.validate().unwrap_err());
        let (status, json) = body_of(error).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["errors"]["title"], "Please add a title");
        assert_eq!(json["errors"]["supplierRating"], "Invalid value for supplierRating");
    }

    #[tokio::test]
    async fn database_errors_are_masked() {
        let error = ApiError::Database(DbError::Config(String::from("secret detail")));
        let (status, json) = body_of(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Server Error");
    }

    #[tokio::test]
    async fn not_found_names_the_kind() {
        let (status, json) = body_of(ApiError::not_found("Task", "abc")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Task not found with id of abc");
    }
}

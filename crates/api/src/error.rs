//! Unified error handling with Sentry integration.
//!
//! Provides a unified `ApiError` type that captures server-class errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, ApiError>`. Every error response carries the standard envelope:
//! `{"success": false, "message": ...}`.
//!
//! # Taxonomy
//!
//! | Variant      | Status | Meaning                                        |
//! |--------------|--------|------------------------------------------------|
//! | `Validation` | 400    | Missing or oversized required input            |
//! | `NotFound`   | 404    | Referenced product/review/category absent      |
//! | `Forbidden`  | 403    | Actor is not the resource's author             |
//! | `Conflict`   | 409    | Duplicate review by the same author            |
//! | `Store`      | 500*   | Store call failed (*404/409 for typed cases)   |
//! | `Gateway`    | 502    | Payment gateway call failed                    |
//! | `Internal`   | 500    | Uncaught fault, logged and surfaced generically|
//!
//! Validation and authorization failures are detected before any mutation and
//! returned with no partial effect. No retries happen anywhere; every failure
//! is terminal for the current request.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::store::StoreError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid required input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Actor is not allowed to touch the resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Duplicate resource (one review per author per product).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Catalog store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Payment gateway operation failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    const fn is_server_class(&self) -> bool {
        matches!(
            self,
            Self::Internal(_)
                | Self::Store(StoreError::Database(_) | StoreError::DataCorruption(_))
                | Self::Gateway(GatewayError::Http(_) | GatewayError::Unexpected { .. })
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) | Self::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Capture server-class errors to Sentry
        if self.is_server_class() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(StoreError::NotFound) => "not found".to_owned(),
            Self::Store(StoreError::Conflict(msg)) => msg.clone(),
            Self::Store(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::Gateway(GatewayError::Declined { .. }) => "Payment failed".to_owned(),
            Self::Gateway(_) => "Payment gateway unavailable".to_owned(),
            Self::Validation(msg) | Self::NotFound(msg) | Self::Forbidden(msg)
            | Self::Conflict(msg) => msg.clone(),
        };

        // A declined sale surfaces the gateway's error payload alongside the
        // envelope; callers must not parse it programmatically.
        let body = if let Self::Gateway(GatewayError::Declined { payload }) = &self {
            json!({ "success": false, "message": message, "error": payload })
        } else {
            json!({ "success": false, "message": message })
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("product cold-brew-kit".to_string());
        assert_eq!(err.to_string(), "Not found: product cold-brew-kit");

        let err = ApiError::Validation("Name is Required".to_string());
        assert_eq!(err.to_string(), "Validation error: Name is Required");
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            get_status(ApiError::Validation("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(ApiError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(ApiError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(ApiError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(ApiError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_errors_map_to_typed_statuses() {
        assert_eq!(
            get_status(ApiError::Store(StoreError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(ApiError::Store(StoreError::Conflict("dup".to_string()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(ApiError::Store(StoreError::DataCorruption("bad".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_declined_sale_maps_to_bad_gateway() {
        let err = ApiError::Gateway(GatewayError::Declined {
            payload: json!({"success": false, "message": "Insufficient Funds"}),
        });
        assert_eq!(get_status(err), StatusCode::BAD_GATEWAY);
    }
}

//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use engine::{ErrorKind, SaleError};
use stock_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// A sale failed.
    Sale(SaleError),
    /// The stock store failed.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorKind::NotFound, msg),
            ApiError::Sale(err) => {
                let kind = err.kind();
                if kind == ErrorKind::Storage {
                    tracing::error!(error = %err, "sale failed on storage");
                }
                (status_for(kind), kind, err.to_string())
            }
            ApiError::Store(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorKind::Storage,
                    err.to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message, "kind": kind.as_str() });
        (status, axum::Json(body)).into_response()
    }
}

/// Maps an engine error classification to an HTTP status.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::SoldOut => StatusCode::CONFLICT,
        ErrorKind::InvalidQuantity => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Conflict => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<SaleError> for ApiError {
    fn from(err: SaleError) -> Self {
        ApiError::Sale(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

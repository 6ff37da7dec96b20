use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::auth::AuthError;
use crate::sender::DeliveryError;
use crate::signing::VerificationError;
use crate::validate::FieldViolation;

/// Errors surfaced by the HTTP endpoints.
///
/// Authentication and validation failures are terminal for the request and
/// never reach the debounce core. Delivery failures only appear here on the
/// synchronous send endpoint; the ingestion path responds before any
/// delivery is attempted.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Signature(#[from] VerificationError),

    #[error("request validation failed")]
    Validation(Vec<FieldViolation>),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::Signature(VerificationError::StaleRequest) => {
                (StatusCode::BAD_REQUEST, "stale_request")
            }
            ApiError::Signature(_) => (StatusCode::BAD_REQUEST, "invalid_signature"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::Auth(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Delivery(_) => (StatusCode::INTERNAL_SERVER_ERROR, "delivery_failed"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let details = match self {
            ApiError::Validation(ref violations) => Some(violations.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            status: status.as_u16(),
            details,
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

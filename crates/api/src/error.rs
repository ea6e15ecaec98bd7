//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::DomainError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The caller could not be identified.
    Unauthorized(String),
    /// Domain rule or store error.
    Domain(DomainError),
    /// Checkout error.
    Checkout(CheckoutError),
}

impl ApiError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Domain(err) => (domain_status(&err), err.to_string()),
            ApiError::Checkout(err) => (checkout_status(&err), err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::InsufficientStock { .. } | DomainError::InvalidOperation { .. } => {
            StatusCode::CONFLICT
        }
        DomainError::ProductNotFound(_) | DomainError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::OwnershipViolation { .. } => StatusCode::FORBIDDEN,
        DomainError::ProductUnavailable(_)
        | DomainError::InvalidQuantity { .. }
        | DomainError::InvalidShippingInfo(_) => StatusCode::BAD_REQUEST,
        DomainError::Storage(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::Domain(e) => domain_status(e),
        CheckoutError::EmptyOrder => StatusCode::BAD_REQUEST,
        CheckoutError::OrderCreation { source, .. } if source.is_transient() => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        CheckoutError::OrderCreation { .. }
        | CheckoutError::OrderNoExhausted { .. }
        | CheckoutError::CompensationIncomplete { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

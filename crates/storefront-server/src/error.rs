//! API Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

/// Error body sent to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// No bearer token on the request
    #[error("Missing or malformed authorization header")]
    Unauthorized,

    /// Bearer token present but not accepted
    #[error("Invalid access token")]
    Forbidden,

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Order already carries a different payment
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payments not configured")]
    PaymentsDisabled,

    #[error("Stripe error: {0}")]
    Stripe(String),

    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::OrderNotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::WebhookSignature(_) | Self::WebhookParse(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentsDisabled => StatusCode::SERVICE_UNAVAILABLE,
            Self::Stripe(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Conflict(_) => "PAYMENT_CONFLICT",
            Self::PaymentsDisabled => "PAYMENTS_DISABLED",
            Self::Stripe(_) => "STRIPE_ERROR",
            Self::WebhookSignature(_) => "INVALID_SIGNATURE",
            Self::WebhookParse(_) => "WEBHOOK_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().into(),
        };
        (status, Json(body)).into_response()
    }
}

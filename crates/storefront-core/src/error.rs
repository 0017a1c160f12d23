//! Error Types

use thiserror::Error;

/// Result type alias for checkout operations
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Checkout error types
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Payment provider rejected a request (card declined, bad number, ...)
    #[error("Payment provider error: {message}")]
    Provider {
        message: String,
        code: Option<String>,
    },

    /// Order service answered with a non-success status
    #[error("Order service returned {status}: {body}")]
    OrderService { status: u16, body: String },

    /// Request never got an answer
    #[error("Network error: {0}")]
    Network(String),

    /// No bearer token available for the order service
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    /// Order service answered without a usable intent secret
    #[error("Payment intent unavailable: {0}")]
    IntentUnavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl CheckoutError {
    /// Build a provider error from the provider's human-readable message
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            code: None,
        }
    }

    /// Check if the failed request may succeed when sent again
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::OrderService { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get user-friendly message
    ///
    /// Provider errors keep the provider's wording, it is written for the
    /// card holder already.
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider { message, .. } if !message.is_empty() => message.clone(),
            Self::Provider { .. } => "Your payment could not be processed.".into(),
            Self::Network(_) => "Could not reach the store. Please try again.".into(),
            Self::Unauthenticated(_) => "Please log in again to continue.".into(),
            Self::IntentUnavailable(_) => "Payment is not ready yet. Please try again.".into(),
            Self::OrderService { .. } => "The store could not update your order.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for CheckoutError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

//! Checkout Configuration

use std::time::Duration;

use storefront_core::RetryPolicy;

/// Client-side checkout settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Base URL of the order-management backend
    pub order_service_url: String,

    /// Stripe publishable key (`pk_...`); payments stay disabled without it
    pub stripe_publishable_key: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Retry schedule for order reconciliation
    pub reconcile: RetryPolicy,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            order_service_url: "http://localhost:5000".into(),
            stripe_publishable_key: None,
            timeout_secs: 30,
            reconcile: RetryPolicy::default(),
        }
    }
}

impl CheckoutConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any variable lookup, falling back to defaults
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let order_service_url = var("ORDER_SERVICE_URL")
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.order_service_url);
        let stripe_publishable_key = var("STRIPE_PUBLISHABLE_KEY").filter(|key| !key.is_empty());
        let timeout_secs = var("REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.timeout_secs);
        let max_attempts = var("RECONCILE_MAX_ATTEMPTS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.reconcile.max_attempts);
        let initial_backoff = var("RECONCILE_BACKOFF_MS")
            .and_then(|v| v.parse().ok())
            .map_or(defaults.reconcile.initial_backoff, Duration::from_millis);

        Self {
            order_service_url,
            stripe_publishable_key,
            timeout_secs,
            reconcile: RetryPolicy {
                max_attempts,
                initial_backoff,
            },
        }
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

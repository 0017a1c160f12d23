//! # storefront-runtime
//!
//! Concrete services for the storefront checkout.
//!
//! ## Adapters
//!
//! - **`HttpOrderService`**: the order-management backend over HTTP/JSON
//! - **`StripeProvider`** (default feature `stripe`): card tokenization and
//!   intent confirmation against Stripe with a publishable key
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_runtime::{CheckoutConfig, checkout_services};
//!
//! let config = CheckoutConfig::from_env();
//! let services = checkout_services(&config, tokens, notifier)?;
//! let mut flow = CheckoutFlow::new(order, services, config.reconcile);
//! ```

pub mod config;
pub mod http;

#[cfg(feature = "stripe")]
pub mod provider;

use std::sync::Arc;

use storefront_core::{CheckoutServices, Notifier, Result, TokenProvider};

pub use config::CheckoutConfig;
pub use http::HttpOrderService;

#[cfg(feature = "stripe")]
pub use provider::StripeProvider;

// Re-export core types for convenience
pub use storefront_core::{
    CardDetails, CheckoutError, CheckoutFlow, FlowState, Order, RetryPolicy, SubmitOutcome,
};

/// Wire the HTTP order service and the given token source and notifier
pub fn checkout_services(
    config: &CheckoutConfig,
    tokens: Arc<dyn TokenProvider>,
    notifier: Arc<dyn Notifier>,
) -> Result<CheckoutServices> {
    Ok(CheckoutServices {
        orders: Arc::new(HttpOrderService::from_config(config)?),
        tokens,
        notifier,
    })
}

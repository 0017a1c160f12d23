//! # storefront-server
//!
//! The order-management service behind the checkout: issues payment
//! intents, records payment outcomes on orders, and settles them against
//! Stripe's webhook.
//!
//! ```text
//! POST  /orders                  seed an order
//! GET   /orders/{id}             look one up
//! POST  /create-payment-intent   { totalCost, orderId? } -> { clientSecret }
//! PATCH /orders/{id}             { order, user, email, amount, transactionId }
//! POST  /webhook/stripe          payment_intent.succeeded / payment_failed
//! GET   /payments/unreconciled   charges no order knows about
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod intent;
pub mod state;
pub mod store;
pub mod webhook;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use config::ServerConfig;
pub use error::{ApiError, Result};
pub use intent::{IntentIssuer, MockIntentIssuer, StripeIntentIssuer};
pub use state::AppState;
pub use store::{MemoryOrderStore, OrderRecord, OrderStore, PaymentStatus};

use crate::handlers::{
    create_order, create_payment_intent, get_order, health_check, list_unreconciled,
    stripe_webhook, update_order,
};

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Orders
        .route("/orders", post(create_order))
        .route("/orders/{id}", get(get_order).patch(update_order))
        // Payments
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/payments/unreconciled", get(list_unreconciled))
        .route("/webhook/stripe", post(stripe_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

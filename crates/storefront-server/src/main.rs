//! storefront order service

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_server::{router, AppState, IntentIssuer, MockIntentIssuer, ServerConfig, StripeIntentIssuer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env();

    let issuer: Arc<dyn IntentIssuer> = match config.stripe_secret_key.as_deref() {
        Some(key) => {
            tracing::info!("✓ Stripe configured");
            Arc::new(StripeIntentIssuer::new(key))
        }
        None => {
            tracing::warn!("⚠ Stripe not configured - issuing mock payment intents");
            tracing::warn!("  Set STRIPE_SECRET_KEY in .env");
            Arc::new(MockIntentIssuer)
        }
    };

    if config.stripe_webhook_secret.is_none() {
        tracing::warn!("⚠ STRIPE_WEBHOOK_SECRET not set - webhook settlement disabled");
    }
    if config.api_token.is_none() {
        tracing::warn!("⚠ ORDER_API_TOKEN not set - any bearer token is accepted");
    }

    let addr = config.bind_addr.clone();
    let app = router(AppState::new(issuer, config));
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 storefront order service running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET   /health                - Health check");
    tracing::info!("  POST  /orders                - Create order");
    tracing::info!("  GET   /orders/{{id}}           - Get order");
    tracing::info!("  PATCH /orders/{{id}}           - Record payment");
    tracing::info!("  POST  /create-payment-intent - Issue payment intent");
    tracing::info!("  GET   /payments/unreconciled - Unmatched charges");
    tracing::info!("  POST  /webhook/stripe        - Stripe webhooks");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

//! HTTP Handlers

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;

use storefront_core::{OrderId, PaymentIntentRequest, PaymentIntentResponse, PaymentRecord};

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::store::{IntentRecord, NewOrder, OrderRecord, OrderStore, PaymentUpdate};
use crate::webhook::WebhookHandler;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub intent_issuer: String,
    pub webhook_configured: bool,
}

#[derive(Serialize)]
pub struct UnreconciledResponse {
    pub count: usize,
    pub payments: Vec<IntentRecord>,
}

// ============================================================================
// Auth
// ============================================================================

/// Check the bearer token against the configured one
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    match state.config.api_token.as_deref() {
        Some(expected) if expected != token => Err(ApiError::Forbidden),
        _ => Ok(()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        intent_issuer: state.issuer.name().to_string(),
        webhook_configured: state.config.stripe_webhook_secret.is_some(),
    })
}

/// Seed an order
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<NewOrder>,
) -> Result<(StatusCode, Json<OrderRecord>)> {
    authorize(&state, &headers)?;

    if request.order_quantity == 0 {
        return Err(ApiError::BadRequest("orderQuantity must be at least 1".into()));
    }

    let order = OrderRecord::new(request);
    state.store.insert(order.clone())?;
    tracing::info!(order_id = %order.id, total = %order.total(), "Order created");

    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderRecord>> {
    authorize(&state, &headers)?;

    let id = OrderId::new(id);
    state
        .store
        .get(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::OrderNotFound(id.to_string()))
}

/// Issue a payment intent sized to `totalCost`
pub async fn create_payment_intent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>> {
    authorize(&state, &headers)?;

    if let Some(order_id) = &request.order_id {
        if state.store.get(order_id)?.is_none() {
            return Err(ApiError::OrderNotFound(order_id.to_string()));
        }
    }

    let intent = state
        .issuer
        .issue(request.total_cost, request.order_id.as_ref())
        .await?;

    state.store.record_intent(IntentRecord::new(
        intent.id.clone(),
        request.order_id.clone(),
        request.total_cost,
    ))?;

    tracing::info!(
        intent_id = %intent.id,
        amount_cents = intent.amount_cents,
        issuer = state.issuer.name(),
        "Payment intent issued"
    );

    Ok(Json(PaymentIntentResponse {
        client_secret: Some(intent.client_secret),
    }))
}

/// Record the payment outcome on an order
pub async fn update_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payment): Json<PaymentRecord>,
) -> Result<Json<PaymentUpdate>> {
    authorize(&state, &headers)?;

    let id = OrderId::new(id);
    let update = state.store.apply_payment(&id, &payment)?;

    tracing::info!(
        order_id = %id,
        transaction_id = %payment.transaction_id,
        modified = update.modified_count,
        "Order payment recorded"
    );

    Ok(Json(update))
}

/// Succeeded charges with no order record
pub async fn list_unreconciled(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UnreconciledResponse>> {
    authorize(&state, &headers)?;

    let payments = state.store.unreconciled()?;
    Ok(Json(UnreconciledResponse {
        count: payments.len(),
        payments,
    }))
}

/// Stripe webhook handler
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode> {
    let secret = state
        .config
        .stripe_webhook_secret
        .as_deref()
        .ok_or(ApiError::PaymentsDisabled)?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::WebhookSignature("Missing Stripe signature".into()))?;

    let handler = WebhookHandler::new(state.store.clone());

    let event = handler.parse_event(&body, signature, secret).inspect_err(|e| {
        tracing::warn!("Webhook signature failed: {}", e);
    })?;

    let parsed = handler.handle(&event)?;
    tracing::debug!(?parsed, "Webhook processed");

    Ok(StatusCode::OK)
}

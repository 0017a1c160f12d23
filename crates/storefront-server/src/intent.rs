//! Payment Intent Issuing
//!
//! `POST /create-payment-intent` hands out a client secret sized to the
//! order total. With Stripe configured the intent is real; otherwise a mock
//! issuer mints look-alike secrets so the checkout can be exercised offline.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use stripe::{Client, CreatePaymentIntent, Currency, PaymentIntent};

use storefront_core::OrderId;

use crate::error::{ApiError, Result};

/// A freshly created intent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedPaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount_cents: i64,
}

/// Convert a dollar total to positive integer cents
pub fn amount_to_cents(total: Decimal) -> Result<i64> {
    if total <= Decimal::ZERO {
        return Err(ApiError::BadRequest("totalCost must be positive".into()));
    }
    (total * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| ApiError::BadRequest("totalCost out of range".into()))
}

/// Creates payment intents at a processor
#[async_trait]
pub trait IntentIssuer: Send + Sync {
    /// Issuer name for logs and health output
    fn name(&self) -> &str;

    /// Create an intent for `total` dollars
    async fn issue(&self, total: Decimal, order_id: Option<&OrderId>) -> Result<IssuedPaymentIntent>;
}

/// Stripe intents, card only, in USD
pub struct StripeIntentIssuer {
    client: Client,
    currency: Currency,
}

impl StripeIntentIssuer {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
            currency: Currency::USD,
        }
    }
}

#[async_trait]
impl IntentIssuer for StripeIntentIssuer {
    fn name(&self) -> &str {
        "Stripe"
    }

    async fn issue(&self, total: Decimal, order_id: Option<&OrderId>) -> Result<IssuedPaymentIntent> {
        let amount_cents = amount_to_cents(total)?;

        let mut params = CreatePaymentIntent::new(amount_cents, self.currency);
        params.payment_method_types = Some(vec!["card".to_string()]);

        // Lets the webhook find the order even if the client never reports back
        let mut metadata = std::collections::HashMap::new();
        if let Some(order_id) = order_id {
            metadata.insert("order_id".to_string(), order_id.to_string());
        }
        params.metadata = Some(metadata);

        let intent = PaymentIntent::create(&self.client, params)
            .await
            .map_err(|e| ApiError::Stripe(e.to_string()))?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| ApiError::Stripe("No client secret returned".into()))?;

        Ok(IssuedPaymentIntent {
            id: intent.id.to_string(),
            client_secret,
            amount_cents,
        })
    }
}

/// Offline issuer minting `pi_mock..._secret_...` secrets
#[derive(Clone, Copy, Debug, Default)]
pub struct MockIntentIssuer;

#[async_trait]
impl IntentIssuer for MockIntentIssuer {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn issue(&self, total: Decimal, _order_id: Option<&OrderId>) -> Result<IssuedPaymentIntent> {
        let amount_cents = amount_to_cents(total)?;
        let id = format!("pi_mock{}", uuid::Uuid::new_v4().simple());
        let client_secret = format!("{id}_secret_{}", uuid::Uuid::new_v4().simple());

        Ok(IssuedPaymentIntent {
            id,
            client_secret,
            amount_cents,
        })
    }
}

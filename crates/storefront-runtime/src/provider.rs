//! Stripe Card Processor
//!
//! Does what Stripe.js does in the browser: with the publishable key it
//! creates a card payment method, then confirms the payment intent with the
//! intent's client secret. The secret key never reaches the client.

use async_trait::async_trait;
use serde::Serialize;
use stripe::{Client, PaymentIntent, StripeError};

use storefront_core::payment::intent_id_from_secret;
use storefront_core::{
    BillingDetails, CardDetails, CheckoutError, PaymentMethod, PaymentProvider, Result,
    TransactionResult,
};

use crate::config::CheckoutConfig;

/// `POST /v1/payment_methods` form
#[derive(Serialize)]
struct CardPaymentMethodForm<'a> {
    #[serde(rename = "type")]
    type_: &'static str,
    card: CardForm<'a>,
    billing_details: BillingForm<'a>,
}

impl<'a> CardPaymentMethodForm<'a> {
    fn new(card: &'a CardDetails, billing: &'a BillingDetails) -> Self {
        Self {
            type_: "card",
            card: CardForm {
                number: card.number.trim(),
                exp_month: card.exp_month,
                exp_year: card.exp_year,
                cvc: &card.cvc,
            },
            billing_details: BillingForm {
                name: &billing.name,
                email: &billing.email,
            },
        }
    }
}

#[derive(Serialize)]
struct CardForm<'a> {
    number: &'a str,
    exp_month: u8,
    exp_year: u16,
    cvc: &'a str,
}

#[derive(Serialize)]
struct BillingForm<'a> {
    name: &'a str,
    email: &'a str,
}

/// `POST /v1/payment_intents/{id}/confirm` form
#[derive(Serialize)]
struct ConfirmForm<'a> {
    client_secret: &'a str,
    payment_method: &'a str,
    receipt_email: &'a str,
}

/// Stripe-backed [`PaymentProvider`]
pub struct StripeProvider {
    client: Client,
}

impl StripeProvider {
    /// Create with a publishable key (`pk_...`)
    pub fn new(publishable_key: &str) -> Self {
        Self {
            client: Client::new(publishable_key),
        }
    }

    /// Create from configuration; `None` if no publishable key is set
    pub fn from_config(config: &CheckoutConfig) -> Option<Self> {
        config.stripe_publishable_key.as_deref().map(Self::new)
    }

    /// Get the underlying Stripe client
    pub const fn inner(&self) -> &Client {
        &self.client
    }
}

const PROCESSOR_UNREACHABLE: &str =
    "Could not reach the payment processor. Please try again.";

/// Map Stripe failures, keeping Stripe's customer-facing message
fn provider_error(err: StripeError) -> CheckoutError {
    match err {
        StripeError::Stripe(request) => CheckoutError::Provider {
            message: request.message.unwrap_or_default(),
            code: request.decline_code,
        },
        other => {
            tracing::warn!(error = %other, "Stripe request failed");
            CheckoutError::provider(PROCESSOR_UNREACHABLE)
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn name(&self) -> &str {
        "Stripe"
    }

    async fn create_payment_method(
        &self,
        card: &CardDetails,
        billing: &BillingDetails,
    ) -> Result<PaymentMethod> {
        let form = CardPaymentMethodForm::new(card, billing);

        let method: stripe::PaymentMethod = self
            .client
            .post_form("/payment_methods", form)
            .await
            .map_err(provider_error)?;

        tracing::debug!(payment_method = %method.id, last4 = card.last4(), "Card tokenized");
        Ok(PaymentMethod {
            id: method.id.to_string(),
        })
    }

    async fn confirm_card_payment(
        &self,
        client_secret: &str,
        method: &PaymentMethod,
        billing: &BillingDetails,
    ) -> Result<TransactionResult> {
        let intent_id = intent_id_from_secret(client_secret)
            .ok_or_else(|| CheckoutError::IntentUnavailable("malformed client secret".into()))?;

        let form = ConfirmForm {
            client_secret,
            payment_method: &method.id,
            receipt_email: &billing.email,
        };

        let intent: PaymentIntent = self
            .client
            .post_form(&format!("/payment_intents/{intent_id}/confirm"), form)
            .await
            .map_err(provider_error)?;

        tracing::info!(payment_intent = %intent.id, status = %intent.status, "Payment intent confirmed");
        Ok(TransactionResult {
            id: intent.id.to_string(),
            status: intent.status.to_string(),
        })
    }
}

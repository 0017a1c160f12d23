//! Payment Provider Strategy
//!
//! Tokenization and confirmation are delegated to a hosted processor. The
//! flow only sees this trait, so Stripe can be swapped for a fake in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::order::BillingDetails;

/// Raw card input as entered by the customer
///
/// Never logged: `Debug` only shows the last four digits.
#[derive(Clone, PartialEq, Eq)]
pub struct CardDetails {
    pub number: String,
    pub exp_month: u8,
    pub exp_year: u16,
    pub cvc: String,
}

impl CardDetails {
    pub fn new(number: impl Into<String>, exp_month: u8, exp_year: u16, cvc: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            exp_month,
            exp_year,
            cvc: cvc.into(),
        }
    }

    /// Last four digits of the card number
    pub fn last4(&self) -> &str {
        let digits = self.number.trim();
        let start = digits.len().saturating_sub(4);
        digits.get(start..).unwrap_or_default()
    }
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &format_args!("**** {}", self.last4()))
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("cvc", &"***")
            .finish()
    }
}

/// Provider token standing in for the card
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
}

/// Outcome of confirming a payment intent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    /// Provider transaction (payment intent) id
    pub id: String,

    /// Provider status string, e.g. `succeeded`
    pub status: String,
}

impl TransactionResult {
    /// Whether the charge went through (or is being settled by the provider)
    pub fn is_settled(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "processing")
    }
}

/// Strategy trait for payment processors
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Tokenize card details into a payment method owned by `billing`
    async fn create_payment_method(
        &self,
        card: &CardDetails,
        billing: &BillingDetails,
    ) -> Result<PaymentMethod>;

    /// Confirm the intent behind `client_secret` with `method`
    async fn confirm_card_payment(
        &self,
        client_secret: &str,
        method: &PaymentMethod,
        billing: &BillingDetails,
    ) -> Result<TransactionResult>;
}

/// Payment intent id embedded in a client secret (`pi_123_secret_abc` -> `pi_123`)
pub fn intent_id_from_secret(client_secret: &str) -> Option<&str> {
    client_secret
        .split_once("_secret_")
        .map(|(id, _)| id)
        .filter(|id| !id.is_empty())
}

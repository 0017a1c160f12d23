//! Intent Initializer
//!
//! Keeps one payment intent per priced quantity. The intent is derived
//! state: `sync` recomputes it only when the price or quantity it was
//! requested for changed, so re-renders never create duplicate intents at
//! the provider.

use rust_decimal::Decimal;

use crate::auth::TokenProvider;
use crate::error::{CheckoutError, Result};
use crate::order::{Order, PricedQuantity};
use crate::service::{OrderService, PaymentIntentRequest};

/// A payment intent secret and what it was sized for
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedIntent {
    client_secret: String,
    priced: PricedQuantity,
}

impl IssuedIntent {
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub const fn priced_quantity(&self) -> PricedQuantity {
        self.priced
    }

    /// Amount the provider will charge
    pub fn total(&self) -> Decimal {
        self.priced.total()
    }
}

impl std::fmt::Debug for IssuedIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedIntent")
            .field("client_secret", &"***")
            .field("priced", &self.priced)
            .finish()
    }
}

/// What a `sync` call did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntentSync {
    /// Priced quantity unchanged, nothing requested
    Unchanged,
    /// A fresh intent secret is stored
    Issued,
    /// The request failed or came back without a secret
    Failed,
}

#[derive(Debug, Default)]
pub struct IntentInitializer {
    requested_for: Option<PricedQuantity>,
    intent: Option<IssuedIntent>,
    requests: u64,
}

impl IntentInitializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn intent(&self) -> Option<&IssuedIntent> {
        self.intent.as_ref()
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.intent.as_ref().map(IssuedIntent::client_secret)
    }

    /// Number of intent requests sent so far
    pub const fn requests_issued(&self) -> u64 {
        self.requests
    }

    /// Whether the stored intent was sized for `order` as it is now
    pub fn is_current(&self, order: &Order) -> bool {
        self.intent
            .as_ref()
            .is_some_and(|intent| intent.priced == order.priced_quantity())
    }

    /// Drop the intent and forget what it was requested for
    pub fn invalidate(&mut self) {
        self.requested_for = None;
        self.intent = None;
    }

    /// Bring the intent in line with `order`
    ///
    /// Fires a request only when the priced quantity differs from the last
    /// one requested. A failed request is not retried until the priced
    /// quantity changes or the caller invalidates.
    pub async fn sync(
        &mut self,
        order: &Order,
        orders: &dyn OrderService,
        tokens: &dyn TokenProvider,
    ) -> IntentSync {
        let priced = order.priced_quantity();
        if self.requested_for == Some(priced) {
            return IntentSync::Unchanged;
        }

        self.requested_for = Some(priced);
        self.intent = None;

        match self.request(order, orders, tokens).await {
            Ok(intent) => {
                tracing::debug!(order_id = %order.id, total = %intent.total(), "Payment intent issued");
                self.intent = Some(intent);
                IntentSync::Issued
            }
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "Payment intent unavailable");
                IntentSync::Failed
            }
        }
    }

    async fn request(
        &mut self,
        order: &Order,
        orders: &dyn OrderService,
        tokens: &dyn TokenProvider,
    ) -> Result<IssuedIntent> {
        let token = tokens.require_token()?;
        let priced = order.priced_quantity();
        let request = PaymentIntentRequest {
            total_cost: priced.total(),
            order_id: Some(order.id.clone()),
        };

        self.requests += 1;
        let response = orders.create_payment_intent(&request, &token).await?;

        let client_secret = response
            .client_secret
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| CheckoutError::IntentUnavailable("response carried no client secret".into()))?;

        Ok(IssuedIntent { client_secret, priced })
    }
}

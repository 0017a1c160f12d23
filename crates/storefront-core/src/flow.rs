//! Checkout Flow
//!
//! One checkout attempt for one order:
//!
//! ```text
//! idle ──▶ intent-ready ──▶ submitting ──┬──▶ tokenize-error ──┐
//!               ▲                         ├──▶ confirm-error ───┤
//!               └─────────────────────────┼─────────────────────┘
//!                                         └──▶ processing ──┬──▶ reconciled
//!                                                           └──▶ reconcile-pending ──▶ reconciled
//! ```
//!
//! Tokenization and confirmation fail independently and report through
//! [`PaymentFailure`] with distinct stages. After either failure the flow is
//! back in `intent-ready` and can be resubmitted.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::auth::TokenProvider;
use crate::intent::{IntentInitializer, IntentSync};
use crate::notice::{Notice, Notifier};
use crate::order::{Order, PaymentRecord};
use crate::payment::{CardDetails, PaymentProvider, TransactionResult};
use crate::reconcile::{OrderReconciler, ReconcileOutcome, RetryPolicy};
use crate::service::OrderService;

pub const PAYMENT_SUCCESS_MESSAGE: &str = "Congratulations, Payment Successful!";
pub const RECONCILE_PENDING_MESSAGE: &str =
    "Your payment went through, but we could not update your order yet. We will keep trying.";

/// Collaborators of a checkout flow
#[derive(Clone)]
pub struct CheckoutServices {
    pub orders: Arc<dyn OrderService>,
    pub tokens: Arc<dyn TokenProvider>,
    pub notifier: Arc<dyn Notifier>,
}

/// Where the flow stands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowState {
    /// No usable payment intent
    Idle,
    /// Intent secret held, waiting for the customer
    IntentReady,
    /// Talking to the payment provider
    Submitting,
    /// Charged, order update in flight
    Processing,
    /// Charged and recorded on the order
    Reconciled,
    /// Charged, order update failed; retry with `retry_reconciliation`
    ReconcilePending,
}

/// Which provider step failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Tokenization,
    Confirmation,
}

/// Customer-facing error from a submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailure {
    pub stage: FailureStage,
    pub message: String,
}

impl PaymentFailure {
    /// Short title to show above the message
    pub const fn title(&self) -> &'static str {
        match self.stage {
            FailureStage::Tokenization => "Card details rejected",
            FailureStage::Confirmation => "Payment not confirmed",
        }
    }
}

impl std::fmt::Display for PaymentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Why a submission did nothing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotReadyReason {
    ProviderUnavailable,
    CardUnavailable,
    MissingIntent,
    /// The intent was sized for a different order total
    StaleIntent,
    /// A submission or order update is still running
    InProgress,
    AlreadyPaid,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    NotReady(NotReadyReason),
    TokenizeFailed(PaymentFailure),
    ConfirmFailed(PaymentFailure),
    Paid {
        transaction: TransactionResult,
        reconciliation: ReconcileOutcome,
    },
}

pub struct CheckoutFlow {
    order: Order,
    services: CheckoutServices,
    provider: Option<Arc<dyn PaymentProvider>>,
    card: Option<CardDetails>,
    intent: IntentInitializer,
    reconciler: OrderReconciler,
    state: FlowState,
    failure: Option<PaymentFailure>,
    transaction: Option<TransactionResult>,
    pending: Option<PaymentRecord>,
}

impl CheckoutFlow {
    pub fn new(order: Order, services: CheckoutServices, retry: RetryPolicy) -> Self {
        Self {
            order,
            services,
            provider: None,
            card: None,
            intent: IntentInitializer::new(),
            reconciler: OrderReconciler::new(retry),
            state: FlowState::Idle,
            failure: None,
            transaction: None,
            pending: None,
        }
    }

    pub const fn order(&self) -> &Order {
        &self.order
    }

    pub const fn state(&self) -> FlowState {
        self.state
    }

    /// Error shown under the card form, if the last submission failed
    pub const fn card_error(&self) -> Option<&PaymentFailure> {
        self.failure.as_ref()
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction.as_ref().map(|t| t.id.as_str())
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.intent.client_secret()
    }

    /// Amount the current intent will charge
    pub fn intent_total(&self) -> Option<Decimal> {
        self.intent.intent().map(crate::intent::IssuedIntent::total)
    }

    /// Intent requests sent by this flow
    pub const fn intent_requests(&self) -> u64 {
        self.intent.requests_issued()
    }

    pub const fn is_processing(&self) -> bool {
        matches!(self.state, FlowState::Submitting | FlowState::Processing)
    }

    /// The provider client finished loading
    pub fn attach_provider(&mut self, provider: Arc<dyn PaymentProvider>) {
        tracing::debug!(provider = provider.name(), "Payment provider attached");
        self.provider = Some(provider);
    }

    /// The card input holds complete details
    pub fn set_card(&mut self, card: CardDetails) {
        self.card = Some(card);
    }

    pub fn clear_card(&mut self) {
        self.card = None;
    }

    /// Flow start: request the payment intent for the order
    pub async fn activate(&mut self) -> IntentSync {
        let sync = self
            .intent
            .sync(&self.order, self.services.orders.as_ref(), self.services.tokens.as_ref())
            .await;
        self.settle_intent_state(sync);
        sync
    }

    /// Change the priced quantity; a new intent is requested only if it changed
    pub async fn update_order(&mut self, price: Decimal, quantity: u32) -> IntentSync {
        if self.transaction.is_some() {
            tracing::warn!(order_id = %self.order.id, "Order already paid, ignoring update");
            return IntentSync::Unchanged;
        }
        self.order.price = price;
        self.order.quantity = quantity;
        self.activate().await
    }

    /// Ask for a fresh intent after a failed request
    pub async fn retry_intent(&mut self) -> IntentSync {
        if self.transaction.is_some() {
            return IntentSync::Unchanged;
        }
        self.intent.invalidate();
        self.activate().await
    }

    /// Whether the pay button should be enabled
    pub fn can_submit(&self) -> bool {
        self.provider.is_some()
            && self.client_secret().is_some_and(|s| !s.is_empty())
            && self.state == FlowState::IntentReady
    }

    fn readiness(&self) -> Result<(), NotReadyReason> {
        match self.state {
            FlowState::Submitting | FlowState::Processing => return Err(NotReadyReason::InProgress),
            FlowState::Reconciled | FlowState::ReconcilePending => return Err(NotReadyReason::AlreadyPaid),
            FlowState::Idle | FlowState::IntentReady => {}
        }
        if self.provider.is_none() {
            return Err(NotReadyReason::ProviderUnavailable);
        }
        if self.card.is_none() {
            return Err(NotReadyReason::CardUnavailable);
        }
        if !self.client_secret().is_some_and(|s| !s.is_empty()) {
            return Err(NotReadyReason::MissingIntent);
        }
        if !self.intent.is_current(&self.order) {
            return Err(NotReadyReason::StaleIntent);
        }
        Ok(())
    }

    /// Customer pressed pay
    pub async fn submit(&mut self) -> SubmitOutcome {
        if let Err(reason) = self.readiness() {
            tracing::debug!(?reason, "Submission ignored");
            return SubmitOutcome::NotReady(reason);
        }
        let (Some(provider), Some(card), Some(intent)) =
            (self.provider.clone(), self.card.clone(), self.intent.intent().cloned())
        else {
            return SubmitOutcome::NotReady(NotReadyReason::MissingIntent);
        };

        self.state = FlowState::Submitting;

        let billing = self.order.billing_details();
        let method = match provider.create_payment_method(&card, &billing).await {
            Ok(method) => method,
            Err(e) => {
                let failure = self.fail(FailureStage::Tokenization, e.user_message());
                return SubmitOutcome::TokenizeFailed(failure);
            }
        };
        self.failure = None;

        let transaction = match provider
            .confirm_card_payment(intent.client_secret(), &method, &billing)
            .await
        {
            Ok(transaction) if transaction.is_settled() => transaction,
            Ok(transaction) => {
                let message = format!("Payment was not completed (status: {}).", transaction.status);
                let failure = self.fail(FailureStage::Confirmation, message);
                return SubmitOutcome::ConfirmFailed(failure);
            }
            Err(e) => {
                let failure = self.fail(FailureStage::Confirmation, e.user_message());
                return SubmitOutcome::ConfirmFailed(failure);
            }
        };

        self.state = FlowState::Processing;
        self.transaction = Some(transaction.clone());
        self.services.notifier.notify(Notice::success(PAYMENT_SUCCESS_MESSAGE));
        tracing::info!(
            order_id = %self.order.id,
            transaction_id = %transaction.id,
            amount = %intent.total(),
            "Payment confirmed"
        );

        let record = PaymentRecord::new(&self.order, intent.total(), transaction.id.clone());
        let reconciliation = self.reconcile(record).await;

        SubmitOutcome::Paid {
            transaction,
            reconciliation,
        }
    }

    /// Send a pending order update again
    ///
    /// Returns `None` when nothing is pending.
    pub async fn retry_reconciliation(&mut self) -> Option<ReconcileOutcome> {
        if self.state != FlowState::ReconcilePending {
            return None;
        }
        let record = self.pending.take()?;
        self.state = FlowState::Processing;
        Some(self.reconcile(record).await)
    }

    async fn reconcile(&mut self, record: PaymentRecord) -> ReconcileOutcome {
        let outcome = self
            .reconciler
            .reconcile(&record, self.services.orders.as_ref(), self.services.tokens.as_ref())
            .await;

        if outcome.is_reconciled() {
            self.state = FlowState::Reconciled;
        } else {
            self.state = FlowState::ReconcilePending;
            self.pending = Some(record);
            self.services.notifier.notify(Notice::warning(RECONCILE_PENDING_MESSAGE));
        }
        outcome
    }

    fn fail(&mut self, stage: FailureStage, message: String) -> PaymentFailure {
        tracing::warn!(order_id = %self.order.id, ?stage, %message, "Payment submission failed");
        let failure = PaymentFailure { stage, message };
        self.services
            .notifier
            .notify(Notice::error(format!("{}: {}", failure.title(), failure.message)));
        self.failure = Some(failure.clone());
        self.state = FlowState::IntentReady;
        failure
    }

    fn settle_intent_state(&mut self, sync: IntentSync) {
        if self.transaction.is_some() {
            return;
        }
        match sync {
            IntentSync::Issued => self.state = FlowState::IntentReady,
            IntentSync::Failed => self.state = FlowState::Idle,
            IntentSync::Unchanged => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::error::CheckoutError;
    use crate::mock::{MockOrderService, MockPaymentProvider};
    use crate::notice::{MemoryNotifier, NoticeLevel};
    use crate::order::BillingDetails;
    use rust_decimal_macros::dec;

    struct Harness {
        orders: Arc<MockOrderService>,
        provider: Arc<MockPaymentProvider>,
        notifier: Arc<MemoryNotifier>,
        flow: CheckoutFlow,
    }

    fn harness(price: Decimal, quantity: u32) -> Harness {
        let orders = Arc::new(MockOrderService::new());
        let provider = Arc::new(MockPaymentProvider::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let services = CheckoutServices {
            orders: orders.clone(),
            tokens: Arc::new(StaticToken::new("token")),
            notifier: notifier.clone(),
        };
        let order = Order::new("o-1", price, quantity, "Ada Lovelace", "ada@example.com");
        let flow = CheckoutFlow::new(order, services, RetryPolicy::immediate(2));
        Harness { orders, provider, notifier, flow }
    }

    async fn ready(price: Decimal, quantity: u32) -> Harness {
        let mut h = harness(price, quantity);
        h.flow.activate().await;
        h.flow.attach_provider(h.provider.clone());
        h.flow.set_card(CardDetails::new("4242424242424242", 12, 2030, "123"));
        h
    }

    #[tokio::test]
    async fn test_successful_checkout_reconciles_total() {
        let mut h = ready(dec!(100), 2).await;
        assert_eq!(h.orders.intent_requests()[0].total_cost, dec!(200));
        assert!(h.flow.can_submit());

        let outcome = h.flow.submit().await;

        let SubmitOutcome::Paid { transaction, reconciliation } = outcome else {
            panic!("expected payment, got {outcome:?}");
        };
        assert!(reconciliation.is_reconciled());
        assert_eq!(h.flow.state(), FlowState::Reconciled);
        assert_eq!(h.flow.transaction_id(), Some(transaction.id.as_str()));

        let updates = h.orders.updates();
        assert_eq!(updates.len(), 1);
        let record = &updates[0].1;
        assert_eq!(record.amount, dec!(200));
        assert_eq!(record.transaction_id, transaction.id);
        assert_eq!(record.order.as_str(), "o-1");

        let (_, _, billing) = &h.provider.confirmations()[0];
        assert_eq!(billing.name, "Ada Lovelace");
        assert_eq!(billing.email, "ada@example.com");
        assert!(h.notifier.drain().iter().any(|n| n.message == PAYMENT_SUCCESS_MESSAGE));
    }

    #[tokio::test]
    async fn test_tokenize_failure_shown_verbatim_and_stops() {
        let mut h = ready(dec!(100), 2).await;
        h.provider.fail_tokenization(Some("Your card number is invalid."));

        let outcome = h.flow.submit().await;

        let SubmitOutcome::TokenizeFailed(failure) = outcome else {
            panic!("expected tokenization failure, got {outcome:?}");
        };
        assert_eq!(failure.message, "Your card number is invalid.");
        assert_eq!(h.flow.card_error().unwrap().message, "Your card number is invalid.");
        assert!(h.provider.confirmations().is_empty());
        assert!(h.orders.update_attempts().is_empty());
        assert_eq!(h.flow.state(), FlowState::IntentReady);
        assert_eq!(
            h.provider.tokenized_billing(),
            [BillingDetails {
                name: "Ada Lovelace".into(),
                email: "ada@example.com".into(),
            }]
        );

        let notices = h.notifier.drain();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].message, "Card details rejected: Your card number is invalid.");
    }

    #[tokio::test]
    async fn test_same_provider_text_gives_distinct_notices() {
        let mut h = ready(dec!(30), 1).await;
        h.provider.fail_tokenization(Some("Your card was declined."));
        h.flow.submit().await;

        h.provider.fail_tokenization(None);
        h.provider.fail_confirmation(Some("Your card was declined."));
        let outcome = h.flow.submit().await;
        assert!(matches!(outcome, SubmitOutcome::ConfirmFailed(_)));

        let notices = h.notifier.drain();
        assert_eq!(notices.len(), 2);
        assert_ne!(notices[0].message, notices[1].message);
        assert_eq!(notices[1].message, "Payment not confirmed: Your card was declined.");
        assert_eq!(h.flow.card_error().unwrap().message, "Your card was declined.");
    }

    #[tokio::test]
    async fn test_confirm_failure_leaves_flow_resubmittable() {
        let mut h = ready(dec!(30), 1).await;
        h.provider.fail_confirmation(Some("Your card was declined."));

        let outcome = h.flow.submit().await;

        let SubmitOutcome::ConfirmFailed(failure) = outcome else {
            panic!("expected confirmation failure, got {outcome:?}");
        };
        assert_eq!(failure.stage, FailureStage::Confirmation);
        assert_eq!(failure.message, "Your card was declined.");
        assert_eq!(failure.title(), "Payment not confirmed");
        assert!(h.flow.transaction_id().is_none());
        assert!(h.orders.update_attempts().is_empty());
        assert!(h.flow.can_submit());

        h.provider.fail_confirmation(None);
        let retry = h.flow.submit().await;
        assert!(matches!(retry, SubmitOutcome::Paid { .. }));
        assert!(h.flow.card_error().is_none());
    }

    #[tokio::test]
    async fn test_unsettled_status_is_a_confirmation_failure() {
        let mut h = ready(dec!(30), 1).await;
        h.provider.confirm_with_status("requires_action");

        let outcome = h.flow.submit().await;

        assert!(matches!(outcome, SubmitOutcome::ConfirmFailed(_)));
        assert!(h.flow.transaction_id().is_none());
    }

    #[tokio::test]
    async fn test_submit_disabled_without_provider_or_secret() {
        let mut h = harness(dec!(10), 1);
        h.flow.set_card(CardDetails::new("4242424242424242", 1, 2031, "999"));
        assert!(!h.flow.can_submit());

        h.flow.activate().await;
        assert!(!h.flow.can_submit());
        assert!(matches!(
            h.flow.submit().await,
            SubmitOutcome::NotReady(NotReadyReason::ProviderUnavailable)
        ));

        let mut empty = harness(dec!(10), 1);
        empty.orders.respond_to_intents_with(Some(""));
        empty.flow.activate().await;
        empty.flow.attach_provider(empty.provider.clone());
        empty.flow.set_card(CardDetails::new("4242424242424242", 1, 2031, "999"));
        assert!(!empty.flow.can_submit());
        assert_eq!(empty.flow.state(), FlowState::Idle);
        assert!(matches!(
            empty.flow.submit().await,
            SubmitOutcome::NotReady(NotReadyReason::MissingIntent)
        ));
        assert!(empty.provider.tokenized_cards().is_empty());
    }

    #[tokio::test]
    async fn test_submit_without_card_is_noop() {
        let mut h = ready(dec!(10), 1).await;
        h.flow.clear_card();

        let outcome = h.flow.submit().await;

        assert!(matches!(outcome, SubmitOutcome::NotReady(NotReadyReason::CardUnavailable)));
        assert!(h.provider.tokenized_cards().is_empty());
    }

    #[tokio::test]
    async fn test_rerender_with_same_order_keeps_intent() {
        let mut h = ready(dec!(25), 2).await;
        let secret = h.flow.client_secret().unwrap().to_string();

        assert_eq!(h.flow.activate().await, IntentSync::Unchanged);
        assert_eq!(h.flow.update_order(dec!(25), 2).await, IntentSync::Unchanged);
        assert_eq!(h.flow.client_secret(), Some(secret.as_str()));
        assert_eq!(h.flow.intent_requests(), 1);

        assert_eq!(h.flow.update_order(dec!(25), 3).await, IntentSync::Issued);
        assert_eq!(h.flow.intent_total(), Some(dec!(75)));
        assert_eq!(h.orders.intent_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_failure_is_visible_and_retryable() {
        let mut h = ready(dec!(100), 2).await;
        h.orders.fail_next_update(CheckoutError::Network("timeout".into()));
        h.orders.fail_next_update(CheckoutError::Network("timeout".into()));

        let outcome = h.flow.submit().await;

        let SubmitOutcome::Paid { reconciliation, .. } = outcome else {
            panic!("expected payment, got {outcome:?}");
        };
        assert!(matches!(reconciliation, ReconcileOutcome::Failed { attempts: 2, .. }));
        assert_eq!(h.flow.state(), FlowState::ReconcilePending);
        assert!(!h.flow.is_processing());
        assert!(h.flow.transaction_id().is_some());
        assert!(h.notifier.snapshot().iter().any(|n| n.level == NoticeLevel::Warning));
        assert!(matches!(
            h.flow.submit().await,
            SubmitOutcome::NotReady(NotReadyReason::AlreadyPaid)
        ));

        let retried = h.flow.retry_reconciliation().await.unwrap();
        assert!(retried.is_reconciled());
        assert_eq!(h.flow.state(), FlowState::Reconciled);
        assert_eq!(h.orders.updates()[0].1.amount, dec!(200));
        assert!(h.flow.retry_reconciliation().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_intent_can_be_retried() {
        let mut h = harness(dec!(10), 1);
        h.orders.respond_to_intents_with(None);
        assert_eq!(h.flow.activate().await, IntentSync::Failed);
        assert_eq!(h.flow.activate().await, IntentSync::Unchanged);

        h.orders.respond_to_intents_with(Some("pi_2_secret_y"));
        assert_eq!(h.flow.retry_intent().await, IntentSync::Issued);
        assert_eq!(h.flow.state(), FlowState::IntentReady);
        assert_eq!(h.flow.client_secret(), Some("pi_2_secret_y"));
    }
}

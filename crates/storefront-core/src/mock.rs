//! In-memory Services
//!
//! Scriptable stand-ins for the order service and the payment processor,
//! for tests and offline demos.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::auth::BearerToken;
use crate::error::{CheckoutError, Result};
use crate::order::{BillingDetails, OrderId, PaymentRecord};
use crate::payment::{intent_id_from_secret, CardDetails, PaymentMethod, PaymentProvider, TransactionResult};
use crate::service::{OrderService, PaymentIntentRequest, PaymentIntentResponse};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
enum IntentReply {
    Generated,
    Fixed(Option<String>),
}

/// Order service that answers from memory and records every call
#[derive(Debug)]
pub struct MockOrderService {
    intent_reply: Mutex<IntentReply>,
    intent_requests: Mutex<Vec<PaymentIntentRequest>>,
    update_failures: Mutex<VecDeque<CheckoutError>>,
    update_attempts: Mutex<Vec<(OrderId, PaymentRecord)>>,
    updates: Mutex<Vec<(OrderId, PaymentRecord)>>,
}

impl Default for MockOrderService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOrderService {
    pub fn new() -> Self {
        Self {
            intent_reply: Mutex::new(IntentReply::Generated),
            intent_requests: Mutex::new(Vec::new()),
            update_failures: Mutex::new(VecDeque::new()),
            update_attempts: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
        }
    }

    /// Answer intent requests with `secret` (`None` = no secret in the body)
    pub fn respond_to_intents_with(&self, secret: Option<&str>) {
        *lock(&self.intent_reply) = IntentReply::Fixed(secret.map(str::to_string));
    }

    /// Fail the next order update with `error`; queued failures are used in order
    pub fn fail_next_update(&self, error: CheckoutError) {
        lock(&self.update_failures).push_back(error);
    }

    pub fn intent_requests(&self) -> Vec<PaymentIntentRequest> {
        lock(&self.intent_requests).clone()
    }

    /// Every update call, failed ones included
    pub fn update_attempts(&self) -> Vec<(OrderId, PaymentRecord)> {
        lock(&self.update_attempts).clone()
    }

    /// Updates that were accepted
    pub fn updates(&self) -> Vec<(OrderId, PaymentRecord)> {
        lock(&self.updates).clone()
    }
}

#[async_trait]
impl OrderService for MockOrderService {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
        _token: &BearerToken,
    ) -> Result<PaymentIntentResponse> {
        let mut requests = lock(&self.intent_requests);
        requests.push(request.clone());

        let client_secret = match &*lock(&self.intent_reply) {
            IntentReply::Generated => Some(format!("pi_mock{n}_secret_{n}", n = requests.len())),
            IntentReply::Fixed(secret) => secret.clone(),
        };
        Ok(PaymentIntentResponse { client_secret })
    }

    async fn update_order_payment(
        &self,
        order_id: &OrderId,
        record: &PaymentRecord,
        _token: &BearerToken,
    ) -> Result<serde_json::Value> {
        lock(&self.update_attempts).push((order_id.clone(), record.clone()));

        if let Some(error) = lock(&self.update_failures).pop_front() {
            return Err(error);
        }

        lock(&self.updates).push((order_id.clone(), record.clone()));
        Ok(serde_json::json!({ "acknowledged": true, "modifiedCount": 1 }))
    }
}

/// Payment processor that accepts every card unless told otherwise
#[derive(Debug, Default)]
pub struct MockPaymentProvider {
    tokenize_error: Mutex<Option<String>>,
    confirm_error: Mutex<Option<String>>,
    confirm_status: Mutex<Option<String>>,
    tokenized: Mutex<Vec<(String, BillingDetails)>>,
    confirmations: Mutex<Vec<(String, PaymentMethod, BillingDetails)>>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject tokenization with `message`; `None` accepts again
    pub fn fail_tokenization(&self, message: Option<&str>) {
        *lock(&self.tokenize_error) = message.map(str::to_string);
    }

    /// Reject confirmation with `message`; `None` accepts again
    pub fn fail_confirmation(&self, message: Option<&str>) {
        *lock(&self.confirm_error) = message.map(str::to_string);
    }

    /// Status reported by successful confirmations (default `succeeded`)
    pub fn confirm_with_status(&self, status: &str) {
        *lock(&self.confirm_status) = Some(status.to_string());
    }

    /// Last four digits of every card tokenized
    pub fn tokenized_cards(&self) -> Vec<String> {
        lock(&self.tokenized).iter().map(|(last4, _)| last4.clone()).collect()
    }

    /// Billing identity sent with every tokenization
    pub fn tokenized_billing(&self) -> Vec<BillingDetails> {
        lock(&self.tokenized).iter().map(|(_, billing)| billing.clone()).collect()
    }

    /// `(client_secret, method, billing)` of every confirmation call
    pub fn confirmations(&self) -> Vec<(String, PaymentMethod, BillingDetails)> {
        lock(&self.confirmations).clone()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    fn name(&self) -> &str {
        "MockProvider"
    }

    async fn create_payment_method(
        &self,
        card: &CardDetails,
        billing: &BillingDetails,
    ) -> Result<PaymentMethod> {
        let mut tokenized = lock(&self.tokenized);
        tokenized.push((card.last4().to_string(), billing.clone()));

        if let Some(message) = lock(&self.tokenize_error).clone() {
            return Err(CheckoutError::provider(message));
        }
        Ok(PaymentMethod { id: format!("pm_mock{}", tokenized.len()) })
    }

    async fn confirm_card_payment(
        &self,
        client_secret: &str,
        method: &PaymentMethod,
        billing: &BillingDetails,
    ) -> Result<TransactionResult> {
        lock(&self.confirmations).push((client_secret.to_string(), method.clone(), billing.clone()));

        if let Some(message) = lock(&self.confirm_error).clone() {
            return Err(CheckoutError::provider(message));
        }

        let status = lock(&self.confirm_status)
            .clone()
            .unwrap_or_else(|| "succeeded".into());
        Ok(TransactionResult {
            id: intent_id_from_secret(client_secret).unwrap_or("pi_mock").to_string(),
            status,
        })
    }
}

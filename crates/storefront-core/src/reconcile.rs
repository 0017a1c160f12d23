//! Order Reconciler
//!
//! Writes a confirmed payment back into the order record. Reconciliation
//! is keyed by transaction id: a transaction that already landed is never
//! sent twice, and a failed write stays visible so it can be retried.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::TokenProvider;
use crate::error::CheckoutError;
use crate::order::PaymentRecord;
use crate::service::OrderService;

/// Retry schedule for order updates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles after each failure
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting
    pub const fn once() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Retry `max_attempts` times without sleeping in between
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exponent)
    }
}

/// Result of one reconciliation run
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The order service accepted the payment record
    Reconciled {
        response: serde_json::Value,
        attempts: u32,
    },

    /// This transaction was reconciled earlier, nothing sent
    AlreadyReconciled,

    /// Every attempt failed; the payment is charged but the order does not know
    Failed {
        attempts: u32,
        error: CheckoutError,
    },
}

impl ReconcileOutcome {
    pub const fn is_reconciled(&self) -> bool {
        matches!(self, Self::Reconciled { .. } | Self::AlreadyReconciled)
    }
}

#[derive(Debug, Default)]
pub struct OrderReconciler {
    policy: RetryPolicy,
    reconciled: HashSet<String>,
}

impl OrderReconciler {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            reconciled: HashSet::new(),
        }
    }

    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn is_reconciled(&self, transaction_id: &str) -> bool {
        self.reconciled.contains(transaction_id)
    }

    /// Send `record` to the order service, retrying transient failures
    pub async fn reconcile(
        &mut self,
        record: &PaymentRecord,
        orders: &dyn OrderService,
        tokens: &dyn TokenProvider,
    ) -> ReconcileOutcome {
        if self.is_reconciled(&record.transaction_id) {
            tracing::debug!(transaction_id = %record.transaction_id, "Payment already reconciled");
            return ReconcileOutcome::AlreadyReconciled;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;

            let result = match tokens.require_token() {
                Ok(token) => orders.update_order_payment(&record.order, record, &token).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(response) => {
                    self.reconciled.insert(record.transaction_id.clone());
                    tracing::info!(
                        order_id = %record.order,
                        transaction_id = %record.transaction_id,
                        amount = %record.amount,
                        attempts = attempt,
                        response = %response,
                        "Order payment reconciled"
                    );
                    return ReconcileOutcome::Reconciled {
                        response,
                        attempts: attempt,
                    };
                }
                Err(e) if e.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        order_id = %record.order,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Order update failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        order_id = %record.order,
                        transaction_id = %record.transaction_id,
                        attempts = attempt,
                        error = %e,
                        "Payment charged but order not updated"
                    );
                    return ReconcileOutcome::Failed {
                        attempts: attempt,
                        error: e,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryTokenStore, StaticToken};
    use crate::mock::MockOrderService;
    use crate::order::Order;
    use rust_decimal_macros::dec;

    fn record() -> PaymentRecord {
        let order = Order::new("o-7", dec!(100), 2, "Ada", "ada@example.com");
        PaymentRecord::new(&order, order.total(), "pi_7")
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_reconcile_sends_record_once() {
        let service = MockOrderService::new();
        let tokens = StaticToken::new("t");
        let mut reconciler = OrderReconciler::new(RetryPolicy::once());

        let first = reconciler.reconcile(&record(), &service, &tokens).await;
        let second = reconciler.reconcile(&record(), &service, &tokens).await;

        assert!(matches!(first, ReconcileOutcome::Reconciled { attempts: 1, .. }));
        assert!(matches!(second, ReconcileOutcome::AlreadyReconciled));
        assert_eq!(service.update_attempts().len(), 1);
        assert_eq!(service.updates()[0].1.amount, dec!(200));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let service = MockOrderService::new();
        service.fail_next_update(CheckoutError::Network("connection reset".into()));
        service.fail_next_update(CheckoutError::OrderService { status: 502, body: String::new() });
        let mut reconciler = OrderReconciler::new(RetryPolicy::immediate(3));

        let outcome = reconciler.reconcile(&record(), &service, &StaticToken::new("t")).await;

        assert!(matches!(outcome, ReconcileOutcome::Reconciled { attempts: 3, .. }));
        assert!(reconciler.is_reconciled("pi_7"));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let service = MockOrderService::new();
        service.fail_next_update(CheckoutError::OrderService { status: 403, body: "forbidden".into() });
        let mut reconciler = OrderReconciler::new(RetryPolicy::immediate(3));

        let outcome = reconciler.reconcile(&record(), &service, &StaticToken::new("t")).await;

        assert!(matches!(outcome, ReconcileOutcome::Failed { attempts: 1, .. }));
        assert_eq!(service.update_attempts().len(), 1);
        assert!(!reconciler.is_reconciled("pi_7"));
    }

    #[tokio::test]
    async fn test_missing_token_fails() {
        let service = MockOrderService::new();
        let mut reconciler = OrderReconciler::new(RetryPolicy::immediate(3));

        let outcome = reconciler.reconcile(&record(), &service, &MemoryTokenStore::new()).await;

        assert!(matches!(
            outcome,
            ReconcileOutcome::Failed { error: CheckoutError::Unauthenticated(_), .. }
        ));
        assert!(service.update_attempts().is_empty());
    }
}

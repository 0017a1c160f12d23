//! Stripe Webhook Handling
//!
//! `payment_intent.succeeded` is the processor's word that money moved. It
//! settles the order the client already reported, or reconciles the order
//! itself when the client's report never arrived.

use rust_decimal::Decimal;
use std::sync::Arc;
use stripe::{Event, EventObject, EventType, Webhook};

use crate::error::{ApiError, Result};
use crate::store::{OrderStore, Settlement};

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Charge succeeded
    PaymentSucceeded {
        intent_id: String,
        amount_cents: i64,
    },

    /// Charge attempt failed
    PaymentFailed {
        intent_id: String,
    },

    /// Unhandled event type
    Other {
        event_type: String,
    },
}

/// Webhook handler
pub struct WebhookHandler<S: OrderStore> {
    store: Arc<S>,
}

impl<S: OrderStore> WebhookHandler<S> {
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Verify webhook signature and parse event
    pub fn parse_event(&self, payload: &str, signature: &str, secret: &str) -> Result<Event> {
        Webhook::construct_event(payload, signature, secret)
            .map_err(|e| ApiError::WebhookSignature(e.to_string()))
    }

    /// Process a verified Stripe event
    pub fn handle(&self, event: &Event) -> Result<WebhookEvent> {
        tracing::info!(event_type = ?event.type_, "Processing Stripe webhook");

        let parsed = Self::parse_webhook_event(event)?;
        self.apply(&parsed)?;
        Ok(parsed)
    }

    /// Apply a parsed event to the order store
    pub fn apply(&self, event: &WebhookEvent) -> Result<Option<Settlement>> {
        match event {
            WebhookEvent::PaymentSucceeded { intent_id, amount_cents } => {
                let amount = Decimal::new(*amount_cents, 2);
                let settlement = self.store.settle_intent(intent_id, amount)?;

                match &settlement {
                    Settlement::Settled(order_id) => {
                        tracing::info!(%intent_id, %order_id, "Order payment settled");
                    }
                    Settlement::Reconciled(order_id) => {
                        tracing::warn!(
                            %intent_id,
                            %order_id,
                            "Order reconciled from webhook, client never reported the payment"
                        );
                    }
                    Settlement::Unmatched => {
                        tracing::error!(
                            %intent_id,
                            %amount,
                            "Charge succeeded without a matching order"
                        );
                    }
                }
                Ok(Some(settlement))
            }

            WebhookEvent::PaymentFailed { intent_id } => {
                tracing::warn!(%intent_id, "Payment failed at processor");
                Ok(None)
            }

            WebhookEvent::Other { event_type } => {
                tracing::debug!(%event_type, "Unhandled webhook event");
                Ok(None)
            }
        }
    }

    /// Parse Stripe event into our event type
    fn parse_webhook_event(event: &Event) -> Result<WebhookEvent> {
        match event.type_ {
            EventType::PaymentIntentSucceeded => {
                if let EventObject::PaymentIntent(intent) = &event.data.object {
                    Ok(WebhookEvent::PaymentSucceeded {
                        intent_id: intent.id.to_string(),
                        amount_cents: intent.amount,
                    })
                } else {
                    Err(ApiError::WebhookParse("Invalid payment intent data".into()))
                }
            }

            EventType::PaymentIntentPaymentFailed => {
                if let EventObject::PaymentIntent(intent) = &event.data.object {
                    Ok(WebhookEvent::PaymentFailed {
                        intent_id: intent.id.to_string(),
                    })
                } else {
                    Err(ApiError::WebhookParse("Invalid payment intent data".into()))
                }
            }

            _ => Ok(WebhookEvent::Other {
                event_type: format!("{:?}", event.type_),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{IntentRecord, MemoryOrderStore, NewOrder, OrderRecord};
    use rust_decimal_macros::dec;

    #[test]
    fn test_succeeded_event_reconciles_order() {
        let store = Arc::new(MemoryOrderStore::new());
        let order = OrderRecord::new(NewOrder {
            price: dec!(100),
            order_quantity: 2,
            user: "Ada".into(),
            email: "ada@example.com".into(),
        });
        store.insert(order.clone()).unwrap();
        store
            .record_intent(IntentRecord::new("pi_1", Some(order.id.clone()), dec!(200)))
            .unwrap();
        let handler = WebhookHandler::new(store.clone());

        let settlement = handler
            .apply(&WebhookEvent::PaymentSucceeded {
                intent_id: "pi_1".into(),
                amount_cents: 20_000,
            })
            .unwrap();

        assert_eq!(settlement, Some(Settlement::Reconciled(order.id.clone())));
        let stored = store.get(&order.id).unwrap().unwrap();
        assert_eq!(stored.amount_paid, Some(dec!(200)));
    }

    #[test]
    fn test_bad_signature_rejected() {
        let handler = WebhookHandler::new(Arc::new(MemoryOrderStore::new()));
        let err = handler
            .parse_event("{}", "t=1,v1=deadbeef", "whsec_test")
            .unwrap_err();
        assert!(matches!(err, ApiError::WebhookSignature(_)));
    }
}

//! Order Storage
//!
//! Orders, their payment state, and every payment intent issued for them.
//! A payment can reach an order two ways: the client's `PATCH` after
//! confirmation, or Stripe's `payment_intent.succeeded` webhook. Both are
//! keyed by the intent (transaction) id, so whichever lands second is a
//! no-op.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use storefront_core::{OrderId, PaymentRecord};

use crate::error::{ApiError, Result};

/// Payment state of an order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    /// Payment reported, not yet seen by the processor's webhook
    Paid,
    /// Payment reported and confirmed by the processor
    Settled,
}

/// Body of `POST /orders`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub price: Decimal,
    pub order_quantity: u32,
    pub user: String,
    pub email: String,
}

/// A stored order
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(rename = "_id")]
    pub id: OrderId,

    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    pub order_quantity: u32,

    pub user: String,

    pub email: String,

    pub status: PaymentStatus,

    #[serde(default)]
    pub transaction_id: Option<String>,

    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount_paid: Option<Decimal>,

    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn new(order: NewOrder) -> Self {
        Self {
            id: OrderId::new(uuid::Uuid::new_v4().simple().to_string()),
            price: order.price,
            order_quantity: order.order_quantity,
            user: order.user,
            email: order.email,
            status: PaymentStatus::Unpaid,
            transaction_id: None,
            amount_paid: None,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn total(&self) -> Decimal {
        self.price * Decimal::from(self.order_quantity)
    }

    fn mark_paid(&mut self, transaction_id: &str, amount: Decimal, settled: bool) {
        self.transaction_id = Some(transaction_id.to_string());
        self.amount_paid = Some(amount);
        self.paid_at = Some(Utc::now());
        self.status = if settled { PaymentStatus::Settled } else { PaymentStatus::Paid };
    }
}

/// A payment intent handed out by `POST /create-payment-intent`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRecord {
    pub intent_id: String,

    #[serde(default)]
    pub order_id: Option<OrderId>,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    /// The processor reported the charge as succeeded
    pub succeeded: bool,

    pub created_at: DateTime<Utc>,
}

impl IntentRecord {
    pub fn new(intent_id: impl Into<String>, order_id: Option<OrderId>, amount: Decimal) -> Self {
        Self {
            intent_id: intent_id.into(),
            order_id,
            amount,
            succeeded: false,
            created_at: Utc::now(),
        }
    }
}

/// Response of `PATCH /orders/{id}`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdate {
    pub acknowledged: bool,
    pub modified_count: u32,
    pub order: OrderRecord,
}

/// What a processor success notification changed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// The order already had this payment; now settled
    Settled(OrderId),
    /// The client never reported the payment; the intent's order was updated
    Reconciled(OrderId),
    /// No order could be tied to the intent
    Unmatched,
}

/// Order storage trait
pub trait OrderStore: Send + Sync {
    /// Save a new order
    fn insert(&self, order: OrderRecord) -> Result<()>;

    /// Get order by id
    fn get(&self, id: &OrderId) -> Result<Option<OrderRecord>>;

    /// Remember an issued payment intent
    fn record_intent(&self, intent: IntentRecord) -> Result<()>;

    /// Apply the client's payment report (idempotent per transaction id)
    fn apply_payment(&self, id: &OrderId, payment: &PaymentRecord) -> Result<PaymentUpdate>;

    /// Apply the processor's success notification for an intent
    fn settle_intent(&self, intent_id: &str, amount: Decimal) -> Result<Settlement>;

    /// Succeeded intents that no order knows about
    fn unreconciled(&self) -> Result<Vec<IntentRecord>>;
}

#[derive(Default)]
struct Tables {
    orders: HashMap<OrderId, OrderRecord>,
    intents: HashMap<String, IntentRecord>,
    by_transaction: HashMap<String, OrderId>,
}

/// In-memory order store (for development)
#[derive(Default)]
pub struct MemoryOrderStore {
    tables: RwLock<Tables>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| ApiError::Storage("order store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| ApiError::Storage("order store lock poisoned".into()))
    }
}

impl OrderStore for MemoryOrderStore {
    fn insert(&self, order: OrderRecord) -> Result<()> {
        let mut tables = self.write()?;
        if let Some(txn) = &order.transaction_id {
            tables.by_transaction.insert(txn.clone(), order.id.clone());
        }
        tables.orders.insert(order.id.clone(), order);
        Ok(())
    }

    fn get(&self, id: &OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.read()?.orders.get(id).cloned())
    }

    fn record_intent(&self, intent: IntentRecord) -> Result<()> {
        self.write()?.intents.insert(intent.intent_id.clone(), intent);
        Ok(())
    }

    fn apply_payment(&self, id: &OrderId, payment: &PaymentRecord) -> Result<PaymentUpdate> {
        if payment.order != *id {
            return Err(ApiError::BadRequest(format!(
                "payment for order {} sent to order {id}",
                payment.order
            )));
        }
        if payment.transaction_id.is_empty() {
            return Err(ApiError::BadRequest("transactionId is required".into()));
        }

        let mut tables = self.write()?;
        let settled = tables
            .intents
            .get(&payment.transaction_id)
            .is_some_and(|intent| intent.succeeded);

        let order = tables
            .orders
            .get_mut(id)
            .ok_or_else(|| ApiError::OrderNotFound(id.to_string()))?;

        match order.transaction_id.as_deref() {
            Some(existing) if existing == payment.transaction_id => {
                return Ok(PaymentUpdate {
                    acknowledged: true,
                    modified_count: 0,
                    order: order.clone(),
                });
            }
            Some(existing) => {
                return Err(ApiError::Conflict(format!(
                    "order {id} already paid by {existing}"
                )));
            }
            None => {}
        }

        if payment.amount != order.total() {
            tracing::warn!(
                order_id = %id,
                reported = %payment.amount,
                expected = %order.total(),
                "Reported amount differs from order total"
            );
        }

        order.mark_paid(&payment.transaction_id, payment.amount, settled);
        let order = order.clone();

        tables
            .by_transaction
            .insert(payment.transaction_id.clone(), id.clone());
        if let Some(intent) = tables.intents.get_mut(&payment.transaction_id) {
            intent.order_id.get_or_insert_with(|| id.clone());
        }

        Ok(PaymentUpdate {
            acknowledged: true,
            modified_count: 1,
            order,
        })
    }

    fn settle_intent(&self, intent_id: &str, amount: Decimal) -> Result<Settlement> {
        let mut tables = self.write()?;

        let intent = tables
            .intents
            .entry(intent_id.to_string())
            .or_insert_with(|| IntentRecord::new(intent_id, None, amount));
        intent.succeeded = true;
        let intent_order = intent.order_id.clone();

        if let Some(order_id) = tables.by_transaction.get(intent_id).cloned() {
            if let Some(order) = tables.orders.get_mut(&order_id) {
                order.status = PaymentStatus::Settled;
            }
            return Ok(Settlement::Settled(order_id));
        }

        let Some(order_id) = intent_order else {
            return Ok(Settlement::Unmatched);
        };
        let Some(order) = tables.orders.get_mut(&order_id) else {
            return Ok(Settlement::Unmatched);
        };
        if order.transaction_id.is_some() {
            // Paid through another intent; this charge needs a refund, not a record.
            return Ok(Settlement::Unmatched);
        }

        order.mark_paid(intent_id, amount, true);
        tables
            .by_transaction
            .insert(intent_id.to_string(), order_id.clone());
        Ok(Settlement::Reconciled(order_id))
    }

    fn unreconciled(&self) -> Result<Vec<IntentRecord>> {
        let tables = self.read()?;
        let mut pending: Vec<IntentRecord> = tables
            .intents
            .values()
            .filter(|intent| intent.succeeded && !tables.by_transaction.contains_key(&intent.intent_id))
            .cloned()
            .collect();
        pending.sort_by_key(|intent| intent.created_at);
        Ok(pending)
    }
}

//! Orders and Payment Records

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order identifier assigned by the order service
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The inputs the order total is derived from
///
/// A payment intent is sized for one `PricedQuantity`; any change to it
/// makes the intent stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PricedQuantity {
    pub price: Decimal,
    pub quantity: u32,
}

impl PricedQuantity {
    pub fn total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// An order as handed to the checkout page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,

    /// Unit price
    pub price: Decimal,

    #[serde(rename = "orderQuantity")]
    pub quantity: u32,

    /// Purchaser display name
    pub user: String,

    /// Purchaser email
    pub email: String,
}

impl Order {
    pub fn new(
        id: impl Into<String>,
        price: Decimal,
        quantity: u32,
        user: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: OrderId::new(id),
            price,
            quantity,
            user: user.into(),
            email: email.into(),
        }
    }

    pub const fn priced_quantity(&self) -> PricedQuantity {
        PricedQuantity {
            price: self.price,
            quantity: self.quantity,
        }
    }

    /// `price * quantity`
    pub fn total(&self) -> Decimal {
        self.priced_quantity().total()
    }

    pub fn billing_details(&self) -> BillingDetails {
        BillingDetails {
            name: self.user.clone(),
            email: self.email.clone(),
        }
    }
}

/// Billing identity attached to a payment confirmation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDetails {
    pub name: String,
    pub email: String,
}

/// Payment outcome written back into the order (`PATCH /orders/{id}` body)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub order: OrderId,
    pub user: String,
    pub email: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub transaction_id: String,
}

impl PaymentRecord {
    /// Record for `order`, charged `amount` under `transaction_id`
    pub fn new(order: &Order, amount: Decimal, transaction_id: impl Into<String>) -> Self {
        Self {
            order: order.id.clone(),
            user: order.user.clone(),
            email: order.email.clone(),
            amount,
            transaction_id: transaction_id.into(),
        }
    }
}

//! Order Service Interface
//!
//! The storefront backend that issues payment intents and stores orders.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::auth::BearerToken;
use crate::error::Result;
use crate::order::{OrderId, PaymentRecord};

/// `POST /create-payment-intent` body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_cost: Decimal,

    /// Lets the service tie the intent to an order for webhook settlement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
}

/// `POST /create-payment-intent` response
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Client side of the order-management backend
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Ask the backend for a payment intent sized to `request.total_cost`
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
        token: &BearerToken,
    ) -> Result<PaymentIntentResponse>;

    /// Partial update of an order with its payment outcome
    ///
    /// The response body is backend-defined and only logged.
    async fn update_order_payment(
        &self,
        order_id: &OrderId,
        record: &PaymentRecord,
        token: &BearerToken,
    ) -> Result<serde_json::Value>;
}

//! Order Service over HTTP
//!
//! `POST /create-payment-intent` and `PATCH /orders/{id}` against the
//! storefront backend, JSON both ways, bearer token on every call.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response};

use storefront_core::{
    BearerToken, CheckoutError, OrderId, OrderService, PaymentIntentRequest,
    PaymentIntentResponse, PaymentRecord, Result,
};

use crate::config::CheckoutConfig;

/// reqwest-backed [`OrderService`]
#[derive(Clone, Debug)]
pub struct HttpOrderService {
    client: Client,
    base_url: String,
}

impl HttpOrderService {
    /// Service at `base_url` with a default client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Create from configuration (base URL and timeout)
    pub fn from_config(config: &CheckoutConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CheckoutError::Config(e.to_string()))?;
        Ok(Self::with_client(client, &config.order_service_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Turn non-2xx answers into `CheckoutError::OrderService`
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CheckoutError::OrderService {
            status: status.as_u16(),
            body,
        })
    }
}

fn network(err: reqwest::Error) -> CheckoutError {
    CheckoutError::Network(err.to_string())
}

/// The order update's 2xx body is only logged, so any text is accepted
fn update_body(order_id: &OrderId, body: &str) -> serde_json::Value {
    if body.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| {
        tracing::debug!(%order_id, %body, "Order update answered with a non-JSON body");
        serde_json::Value::String(body.to_string())
    })
}

#[async_trait]
impl OrderService for HttpOrderService {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
        token: &BearerToken,
    ) -> Result<PaymentIntentResponse> {
        let response = self
            .client
            .post(self.url("create-payment-intent"))
            .header(AUTHORIZATION, token.header_value())
            .json(request)
            .send()
            .await
            .map_err(network)?;

        let response = Self::check(response).await?;
        response.json().await.map_err(network)
    }

    async fn update_order_payment(
        &self,
        order_id: &OrderId,
        record: &PaymentRecord,
        token: &BearerToken,
    ) -> Result<serde_json::Value> {
        let response = self
            .client
            .patch(self.url(&format!("orders/{order_id}")))
            .header(AUTHORIZATION, token.header_value())
            .json(record)
            .send()
            .await
            .map_err(network)?;

        let response = Self::check(response).await?;
        let body = response.text().await.map_err(network)?;
        Ok(update_body(order_id, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let service = HttpOrderService::new("http://localhost:5000/");
        assert_eq!(service.base_url(), "http://localhost:5000");
        assert_eq!(service.url("/orders/o-1"), "http://localhost:5000/orders/o-1");
        assert_eq!(
            service.url("create-payment-intent"),
            "http://localhost:5000/create-payment-intent"
        );
    }

    #[test]
    fn test_update_body_accepts_any_text() {
        let id = OrderId::new("o-1");
        assert_eq!(update_body(&id, ""), serde_json::Value::Null);
        assert_eq!(update_body(&id, r#"{"modifiedCount":1}"#)["modifiedCount"], 1);
        assert_eq!(update_body(&id, "OK"), serde_json::Value::String("OK".into()));
    }

    #[tokio::test]
    async fn test_plain_text_update_is_success() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 2\r\nconnection: close\r\n\r\nOK")
                .await
                .unwrap();
        });

        let service = HttpOrderService::new(format!("http://{addr}"));
        let order = storefront_core::Order::new("o-1", 100.into(), 2, "Ada", "ada@example.com");
        let record = PaymentRecord::new(&order, 200.into(), "pi_1");

        let body = service
            .update_order_payment(&order.id, &record, &BearerToken::new("t"))
            .await
            .unwrap();

        assert_eq!(body, serde_json::Value::String("OK".into()));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let service = HttpOrderService::new("http://127.0.0.1:9");
        let request = PaymentIntentRequest {
            total_cost: 10.into(),
            order_id: None,
        };

        let err = service
            .create_payment_intent(&request, &BearerToken::new("t"))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Network(_)));
        assert!(err.is_retryable());
    }
}

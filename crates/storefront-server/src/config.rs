//! Server Configuration

/// Order service settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,

    /// Stripe secret key (`sk_...`); without it intents come from the mock issuer
    pub stripe_secret_key: Option<String>,

    /// Webhook signing secret (`whsec_...`); without it the webhook is disabled
    pub stripe_webhook_secret: Option<String>,

    /// Bearer token clients must present. `None` accepts any non-empty token.
    pub api_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".into(),
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            api_token: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let set = |key: &str| var(key).filter(|v| !v.is_empty());

        Self {
            bind_addr: set("BIND_ADDR").unwrap_or_else(|| Self::default().bind_addr),
            stripe_secret_key: set("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: set("STRIPE_WEBHOOK_SECRET"),
            api_token: set("ORDER_API_TOKEN"),
        }
    }
}

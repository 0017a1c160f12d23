//! Application State

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::intent::IntentIssuer;
use crate::store::MemoryOrderStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Orders and issued intents
    pub store: Arc<MemoryOrderStore>,

    /// Payment intent issuer (Stripe, or mock when unconfigured)
    pub issuer: Arc<dyn IntentIssuer>,

    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(issuer: Arc<dyn IntentIssuer>, config: ServerConfig) -> Self {
        Self {
            store: Arc::new(MemoryOrderStore::new()),
            issuer,
            config: Arc::new(config),
        }
    }
}

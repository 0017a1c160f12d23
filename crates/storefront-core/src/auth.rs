//! Access Tokens
//!
//! The order service wants a bearer token. Whoever signed the customer in
//! puts it into a [`TokenProvider`]; the checkout flow only reads it.

use std::sync::{PoisonError, RwLock};

use crate::error::{CheckoutError, Result};

/// Bearer credential for the order service
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// Source of the current access token
pub trait TokenProvider: Send + Sync {
    /// Current token, if the customer is signed in
    fn access_token(&self) -> Option<BearerToken>;

    /// Current token or [`CheckoutError::Unauthenticated`]
    fn require_token(&self) -> Result<BearerToken> {
        self.access_token()
            .ok_or_else(|| CheckoutError::Unauthenticated("no access token stored".into()))
    }
}

/// Fixed token, for service accounts and tests
#[derive(Clone, Debug)]
pub struct StaticToken(BearerToken);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(BearerToken::new(token))
    }
}

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Option<BearerToken> {
        Some(self.0.clone())
    }
}

/// Token slot written by the sign-in flow
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<BearerToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the token issued after sign-in or sign-up
    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        let mut slot = self.token.write().unwrap_or_else(PoisonError::into_inner);
        *slot = (!token.is_empty()).then(|| BearerToken::new(token));
    }

    /// Forget the token (sign-out)
    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl TokenProvider for MemoryTokenStore {
    fn access_token(&self) -> Option<BearerToken> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryTokenStore::new();
        assert!(store.require_token().is_err());

        store.set("abc");
        assert_eq!(store.require_token().unwrap().header_value(), "Bearer abc");

        store.clear();
        assert!(store.access_token().is_none());
    }

    #[test]
    fn test_empty_token_is_not_stored() {
        let store = MemoryTokenStore::new();
        store.set("");
        assert!(store.access_token().is_none());
    }

    #[test]
    fn test_token_debug_hides_secret() {
        assert_eq!(format!("{:?}", BearerToken::new("abc")), "BearerToken(***)");
    }
}

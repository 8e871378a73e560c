use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inkgate_core::{hash_token, AccessToken};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Issued access tokens, keyed by the SHA-256 of the bearer value.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Look up by raw bearer value.
    async fn get(&self, token: &str) -> Result<Option<AccessToken>>;
    async fn put(&self, token: AccessToken) -> Result<()>;
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}

#[derive(Default)]
pub struct TokenRepository {
    tokens: RwLock<HashMap<String, AccessToken>>,
}

impl TokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn get(&self, token: &str) -> Result<Option<AccessToken>> {
        let token_hash = hash_token(token);
        Ok(self.tokens.read().await.get(&token_hash).cloned())
    }

    async fn put(&self, token: AccessToken) -> Result<()> {
        self.tokens
            .write()
            .await
            .insert(token.token_hash.clone(), token);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, token| token.is_active_at(now));
        Ok(before - tokens.len())
    }
}

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inkgate_core::AuthorizationCode;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Authorization codes awaiting redemption.
#[async_trait]
pub trait CodeStore: Send + Sync {
    async fn get(&self, code: &str) -> Result<Option<AuthorizationCode>>;
    async fn put(&self, code: AuthorizationCode) -> Result<()>;

    /// Atomically mark a code consumed. Returns the record only to the caller
    /// that flipped it; absent, expired or already consumed codes yield `None`.
    async fn consume(&self, code: &str, now: DateTime<Utc>) -> Result<Option<AuthorizationCode>>;

    /// Drop codes that are expired or consumed. Returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}

#[derive(Default)]
pub struct CodeRepository {
    codes: RwLock<HashMap<String, AuthorizationCode>>,
}

impl CodeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CodeStore for CodeRepository {
    async fn get(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        Ok(self.codes.read().await.get(code).cloned())
    }

    async fn put(&self, code: AuthorizationCode) -> Result<()> {
        self.codes.write().await.insert(code.code.clone(), code);
        Ok(())
    }

    async fn consume(&self, code: &str, now: DateTime<Utc>) -> Result<Option<AuthorizationCode>> {
        let mut codes = self.codes.write().await;
        match codes.get_mut(code) {
            Some(record) if record.is_valid_at(now) => {
                record.mark_consumed();
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut codes = self.codes.write().await;
        let before = codes.len();
        codes.retain(|_, record| record.is_valid_at(now));
        Ok(before - codes.len())
    }
}

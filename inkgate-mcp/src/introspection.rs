// Inkgate - Scope-gated notebook tools over OAuth 2.0
// Copyright (C) 2025 Inkgate Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Token introspection against the authorization server.
//!
//! Every failure path yields an inactive record so that an unreachable
//! authorization server denies access instead of granting it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use inkgate_core::{hash_token, IntrospectionRecord};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error};

#[async_trait]
pub trait TokenIntrospector: Send + Sync {
    /// Never errors: anything other than a confirmed active token is
    /// reported as inactive.
    async fn introspect(&self, token: &str) -> IntrospectionRecord;
}

/// RFC 7662 client for the authorization server's `/introspect` endpoint.
#[derive(Debug, Clone)]
pub struct HttpIntrospector {
    client: Client,
    endpoint: String,
}

impl HttpIntrospector {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self, token: &str) -> Result<IntrospectionRecord> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("token", token)])
            .send()
            .await
            .context("Failed to send introspection request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Introspection endpoint returned status: {}", status);
        }

        response
            .json::<IntrospectionRecord>()
            .await
            .context("Failed to decode introspection response")
    }
}

#[async_trait]
impl TokenIntrospector for HttpIntrospector {
    async fn introspect(&self, token: &str) -> IntrospectionRecord {
        match self.fetch(token).await {
            Ok(record) => record,
            Err(e) => {
                error!(
                    endpoint = %self.endpoint,
                    "Authorization server unreachable, treating token as inactive: {:#}",
                    e
                );
                IntrospectionRecord::inactive()
            }
        }
    }
}

struct CacheEntry {
    record: IntrospectionRecord,
    fresh_until: Instant,
}

/// Short-lived cache of active introspection results, keyed by token hash.
/// Inactive answers are never cached, so a miss always reaches the
/// authorization server.
pub struct CachedIntrospector {
    inner: Arc<dyn TokenIntrospector>,
    ttl: Duration,
    capacity: usize,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl CachedIntrospector {
    pub fn new(inner: Arc<dyn TokenIntrospector>, ttl: Duration, capacity: usize) -> Self {
        Self {
            inner,
            ttl,
            capacity,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn lookup(&self, key: &str) -> Option<IntrospectionRecord> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        let still_active = entry.record.is_active_at(Utc::now().timestamp());
        (Instant::now() < entry.fresh_until && still_active).then(|| entry.record.clone())
    }

    async fn store(&self, key: String, record: &IntrospectionRecord) {
        let now = Instant::now();
        let mut lifetime = self.ttl;
        if let Some(exp) = record.exp {
            let remaining = (exp - Utc::now().timestamp()).max(0) as u64;
            lifetime = lifetime.min(Duration::from_secs(remaining));
        }
        if lifetime.is_zero() {
            return;
        }

        let mut entries = self.entries.write().await;
        if entries.len() >= self.capacity {
            entries.retain(|_, entry| entry.fresh_until > now);
        }
        if entries.len() >= self.capacity {
            debug!(capacity = self.capacity, "Introspection cache full, not caching");
            return;
        }

        entries.insert(
            key,
            CacheEntry {
                record: record.clone(),
                fresh_until: now + lifetime,
            },
        );
    }
}

#[async_trait]
impl TokenIntrospector for CachedIntrospector {
    async fn introspect(&self, token: &str) -> IntrospectionRecord {
        let key = hash_token(token);
        if let Some(record) = self.lookup(&key).await {
            debug!("Introspection cache hit");
            return record;
        }

        let record = self.inner.introspect(token).await;
        if record.active {
            self.store(key, &record).await;
        }
        record
    }
}

use anyhow::Result;
use async_trait::async_trait;
use inkgate_core::OAuthClient;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Registered OAuth clients. Records are immutable once stored.
#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn get(&self, client_id: &str) -> Result<Option<OAuthClient>>;
    async fn put(&self, client: OAuthClient) -> Result<()>;
}

#[derive(Default)]
pub struct ClientRepository {
    clients: RwLock<HashMap<String, OAuthClient>>,
}

impl ClientRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for ClientRepository {
    async fn get(&self, client_id: &str) -> Result<Option<OAuthClient>> {
        Ok(self.clients.read().await.get(client_id).cloned())
    }

    async fn put(&self, client: OAuthClient) -> Result<()> {
        let mut clients = self.clients.write().await;
        if clients.contains_key(&client.client_id) {
            anyhow::bail!("Client {} is already registered", client.client_id);
        }
        tracing::debug!(client_id = %client.client_id, "Stored client registration");
        clients.insert(client.client_id.clone(), client);
        Ok(())
    }
}

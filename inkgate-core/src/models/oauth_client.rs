use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scope::ScopeSet;

pub const AUTH_METHOD_NONE: &str = "none";
pub const AUTH_METHOD_SECRET_POST: &str = "client_secret_post";
pub const AUTH_METHOD_SECRET_BASIC: &str = "client_secret_basic";

/// OAuth2 client for dynamic registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret_hash: Option<String>,
    pub client_name: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub scope: Option<ScopeSet>,
    pub token_endpoint_auth_method: String,
    pub created_at: DateTime<Utc>,
}

impl OAuthClient {
    pub fn new(client_name: String, redirect_uris: Vec<String>) -> Self {
        Self {
            client_id: format!("inkgate_{}", uuid::Uuid::new_v4()),
            client_secret_hash: None,
            client_name,
            redirect_uris,
            grant_types: vec!["authorization_code".to_string()],
            response_types: vec!["code".to_string()],
            scope: None,
            token_endpoint_auth_method: AUTH_METHOD_NONE.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Redirect URIs must match a registered value exactly.
    pub fn validate_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    pub fn is_confidential(&self) -> bool {
        self.token_endpoint_auth_method != AUTH_METHOD_NONE
    }

    /// A client registered without a scope may request any supported scope.
    pub fn allows_scope(&self, requested: &ScopeSet) -> bool {
        match &self.scope {
            Some(registered) => requested.is_subset(registered),
            None => true,
        }
    }
}

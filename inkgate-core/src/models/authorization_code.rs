use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::pkce::PkceChallenge;
use super::scope::ScopeSet;
use crate::security::generate_secure_token;

/// OAuth2 authorization code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: ScopeSet,
    pub pkce: PkceChallenge,
    pub subject: String,
    pub resource: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}

impl AuthorizationCode {
    pub fn new(
        client_id: String,
        redirect_uri: String,
        scope: ScopeSet,
        pkce: PkceChallenge,
        subject: String,
        resource: Option<String>,
        lifetime: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            code: format!("ic_{}", generate_secure_token(40)),
            client_id,
            redirect_uri,
            scope,
            pkce,
            subject,
            resource,
            expires_at: now + lifetime,
            consumed: false,
            created_at: now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && !self.is_expired_at(now)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn mark_consumed(&mut self) {
        self.consumed = true;
    }
}

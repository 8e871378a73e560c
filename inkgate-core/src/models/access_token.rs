use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::introspection::{Audience, IntrospectionRecord};
use super::scope::ScopeSet;
use crate::security::{generate_secure_token, hash_token};

/// OAuth2 access token. Only the SHA-256 of the bearer value is retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub token_hash: String,
    pub client_id: String,
    pub subject: String,
    pub scope: ScopeSet,
    pub resource: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Mint a new token, returning the bearer value alongside the record.
    /// Timestamps are whole seconds so `exp` matches `expires_at` exactly.
    pub fn issue(
        client_id: String,
        subject: String,
        scope: ScopeSet,
        resource: Option<String>,
        lifetime: Duration,
    ) -> (String, Self) {
        let token = format!("it_{}", generate_secure_token(64));
        let now = Utc::now().trunc_subsecs(0);
        let record = Self {
            token_hash: hash_token(&token),
            client_id,
            subject,
            scope,
            resource,
            issued_at: now,
            expires_at: (now + lifetime).trunc_subsecs(0),
        };
        (token, record)
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    pub fn introspect_at(&self, now: DateTime<Utc>) -> IntrospectionRecord {
        if !self.is_active_at(now) {
            return IntrospectionRecord::inactive();
        }

        IntrospectionRecord {
            active: true,
            scope: Some(self.scope.to_string()),
            exp: Some(self.expires_at.timestamp()),
            iat: Some(self.issued_at.timestamp()),
            client_id: Some(self.client_id.clone()),
            sub: Some(self.subject.clone()),
            aud: self.resource.clone().map(Audience::from),
            token_type: Some("Bearer".to_string()),
        }
    }
}

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

//! Fixtures shared by the handler tests.

use async_trait::async_trait;
use chrono::Utc;
use inkgate_core::{Audience, IntrospectionRecord};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{config::Config, introspection::TokenIntrospector, state::AppState};

/// Answers introspection from a fixed table. Unknown tokens are inactive.
#[derive(Default)]
pub struct StubIntrospector {
    records: HashMap<String, IntrospectionRecord>,
}

impl StubIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, token: &str, record: IntrospectionRecord) -> Self {
        self.records.insert(token.to_string(), record);
        self
    }

    pub fn with_token(self, token: &str, scope: &str) -> Self {
        let record = active(scope, 3600, None);
        self.with_record(token, record)
    }

    pub fn with_audience(self, token: &str, scope: &str, aud: &str) -> Self {
        let record = active(scope, 3600, Some(Audience::One(aud.to_string())));
        self.with_record(token, record)
    }

    pub fn with_audiences(self, token: &str, scope: &str, auds: &[&str]) -> Self {
        let auds = auds.iter().map(|aud| aud.to_string()).collect();
        let record = active(scope, 3600, Some(Audience::Many(auds)));
        self.with_record(token, record)
    }

    /// Claims active but `exp` is already past.
    pub fn with_expired(self, token: &str, scope: &str) -> Self {
        let record = active(scope, -10, None);
        self.with_record(token, record)
    }
}

fn active(scope: &str, lifetime_secs: i64, aud: Option<Audience>) -> IntrospectionRecord {
    let now = Utc::now().timestamp();
    IntrospectionRecord {
        active: true,
        scope: Some(scope.to_string()),
        exp: Some(now + lifetime_secs),
        iat: Some(now),
        client_id: Some("test_client".to_string()),
        sub: Some("demo_user".to_string()),
        aud,
        token_type: Some("Bearer".to_string()),
    }
}

#[async_trait]
impl TokenIntrospector for StubIntrospector {
    async fn introspect(&self, token: &str) -> IntrospectionRecord {
        self.records
            .get(token)
            .cloned()
            .unwrap_or_else(IntrospectionRecord::inactive)
    }
}

pub fn create_test_app_state(stub: StubIntrospector) -> anyhow::Result<AppState> {
    AppState::new(Config::default(), Arc::new(stub))
}

pub fn create_strict_test_app_state(stub: StubIntrospector) -> anyhow::Result<AppState> {
    let config = Config {
        strict_audience: true,
        ..Config::default()
    };
    AppState::new(config, Arc::new(stub))
}

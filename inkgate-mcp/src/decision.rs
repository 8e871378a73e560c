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

use chrono::Utc;
use inkgate_core::{IntrospectionRecord, Scope};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::introspection::TokenIntrospector;
use crate::registry::ToolScopeRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyKind {
    InvalidToken,
    InsufficientScope,
}

impl DenyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyKind::InvalidToken => "invalid_token",
            DenyKind::InsufficientScope => "insufficient_scope",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow { subject: Option<String> },
    Deny { kind: DenyKind, required_scope: Scope },
}

/// A tool with no registry entry was requested. This is a configuration
/// fault, not an authorization outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTool(pub String);

impl fmt::Display for UnknownTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown tool: {}", self.0)
    }
}

impl std::error::Error for UnknownTool {}

/// Decides whether a bearer token may invoke a tool.
pub struct DecisionEngine {
    registry: Arc<ToolScopeRegistry>,
    introspector: Arc<dyn TokenIntrospector>,
    /// Set only when strict audience validation is on.
    audience: Option<Url>,
}

impl DecisionEngine {
    pub fn new(registry: Arc<ToolScopeRegistry>, introspector: Arc<dyn TokenIntrospector>) -> Self {
        Self {
            registry,
            introspector,
            audience: None,
        }
    }

    /// Require the token's `aud` to cover `resource`.
    pub fn with_strict_audience(mut self, resource: Url) -> Self {
        self.audience = Some(resource);
        self
    }

    pub async fn authorize_request(
        &self,
        tool: &str,
        bearer: Option<&str>,
    ) -> Result<Decision, UnknownTool> {
        let required_scope = self
            .registry
            .required_scope(tool)
            .ok_or_else(|| UnknownTool(tool.to_string()))?;

        let deny = |kind| Decision::Deny {
            kind,
            required_scope,
        };

        let Some(token) = bearer.filter(|t| !t.is_empty()) else {
            debug!(tool, "No bearer token presented");
            return Ok(deny(DenyKind::InvalidToken));
        };

        let record = self.introspector.introspect(token).await;
        if !record.is_active_at(Utc::now().timestamp()) {
            debug!(tool, "Inactive bearer token");
            return Ok(deny(DenyKind::InvalidToken));
        }

        if let Some(resource) = &self.audience {
            if !self.audience_ok(&record, resource) {
                info!(tool, aud = ?record.aud, "Token audience does not cover this resource");
                return Ok(deny(DenyKind::InvalidToken));
            }
        }

        if !record.scopes().contains(required_scope) {
            info!(
                tool,
                required = %required_scope,
                granted = ?record.scope,
                "Insufficient scope"
            );
            return Ok(deny(DenyKind::InsufficientScope));
        }

        Ok(Decision::Allow {
            subject: record.sub,
        })
    }

    fn audience_ok(&self, record: &IntrospectionRecord, resource: &Url) -> bool {
        record
            .aud
            .as_ref()
            .map_or(false, |aud| aud.iter().any(|aud| audience_matches(aud, resource)))
    }
}

/// Hierarchical RFC 8707 match: same origin, and the resource path lies at
/// or below the audience path.
pub fn audience_matches(aud: &str, resource: &Url) -> bool {
    let Ok(aud) = Url::parse(aud) else {
        return false;
    };

    if aud.scheme() != resource.scheme()
        || aud.host_str() != resource.host_str()
        || aud.port_or_known_default() != resource.port_or_known_default()
    {
        return false;
    }

    let aud_path = aud.path().trim_end_matches('/');
    let resource_path = resource.path().trim_end_matches('/');
    resource_path == aud_path
        || resource_path
            .strip_prefix(aud_path)
            .map_or(false, |rest| rest.starts_with('/'))
}

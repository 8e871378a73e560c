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

use inkgate_db::NoteRepository;
use std::sync::Arc;
use url::Url;

use crate::config::Config;
use crate::decision::DecisionEngine;
use crate::discovery::ProtectedResourceMetadata;
use crate::introspection::{CachedIntrospector, HttpIntrospector, TokenIntrospector};
use crate::registry::ToolScopeRegistry;
use crate::tools::{notebook_registry, NotebookTools, TOOL_NAMES};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DecisionEngine>,
    pub registry: Arc<ToolScopeRegistry>,
    pub tools: Arc<NotebookTools>,
    /// Computed once from configuration at startup.
    pub metadata: Arc<ProtectedResourceMetadata>,
    pub config: Config,
}

impl AppState {
    /// Fails if any exposed tool lacks a scope requirement or the resource
    /// URL does not parse.
    pub fn new(config: Config, introspector: Arc<dyn TokenIntrospector>) -> anyhow::Result<Self> {
        let registry = notebook_registry();
        registry.ensure_covers(TOOL_NAMES)?;
        let registry = Arc::new(registry);

        let resource = Url::parse(&config.server_url())?;
        let mut engine = DecisionEngine::new(registry.clone(), introspector);
        if config.strict_audience {
            engine = engine.with_strict_audience(resource);
        }

        let metadata = ProtectedResourceMetadata::new(config.server_url())
            .authorization_server(config.auth_server_url())
            .scopes(registry.scopes_supported().to_strings());

        Ok(Self {
            engine: Arc::new(engine),
            registry,
            tools: Arc::new(NotebookTools::new(Arc::new(NoteRepository::new()))),
            metadata: Arc::new(metadata),
            config,
        })
    }

    /// Introspect over HTTP behind the short-lived cache.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let http = HttpIntrospector::new(
            config.introspection_endpoint(),
            config.introspection_timeout(),
        )?;
        let cached = CachedIntrospector::new(
            Arc::new(http),
            config.cache_ttl(),
            config.cache_capacity,
        );
        Self::new(config, Arc::new(cached))
    }
}

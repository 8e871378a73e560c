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

use serde_json::Value;
use std::sync::Arc;
use tera::Tera;

use crate::authenticator::DemoAuthenticator;
use crate::config::Config;
use crate::oauth2::discovery::authorization_server_metadata;
use crate::services::AuthorizationServer;
use inkgate_db::{ClientRepository, CodeRepository, TokenRepository};

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<AuthorizationServer>,
    pub templates: Arc<Tera>,
    pub config: Config,
    /// Computed once from the issuer at startup.
    pub metadata: Arc<Value>,
}

impl AppState {
    pub fn new(server: AuthorizationServer, templates: Tera, config: Config) -> Self {
        let metadata = authorization_server_metadata(&config.issuer_url());
        Self {
            server: Arc::new(server),
            templates: Arc::new(templates),
            config,
            metadata: Arc::new(metadata),
        }
    }

    /// In-memory stores and the demo credential check.
    pub fn in_memory(config: Config) -> anyhow::Result<Self> {
        let authenticator =
            DemoAuthenticator::new(config.demo_username.clone(), config.demo_password.clone());
        let server = AuthorizationServer::new(
            Arc::new(ClientRepository::new()),
            Arc::new(CodeRepository::new()),
            Arc::new(TokenRepository::new()),
            Arc::new(authenticator),
        )
        .with_lifetimes(config.code_lifetime(), config.token_lifetime());

        Ok(Self::new(server, crate::templates::init_templates()?, config))
    }
}

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

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Canonical resource URL of the MCP endpoint. Derived from the port
    /// when unset.
    #[serde(default)]
    pub server_url: Option<String>,

    #[serde(default = "default_auth_server_url")]
    pub auth_server_url: String,

    /// Defaults to `{auth_server_url}/introspect`.
    #[serde(default)]
    pub introspection_endpoint: Option<String>,

    #[serde(default = "default_introspection_timeout_ms")]
    pub introspection_timeout_ms: u64,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Reject tokens whose audience does not cover this resource.
    #[serde(default)]
    pub strict_audience: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            server_url: None,
            auth_server_url: default_auth_server_url(),
            introspection_endpoint: None,
            introspection_timeout_ms: default_introspection_timeout_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            strict_audience: false,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::figment().extract().map_err(Into::into)
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("inkgate-mcp.toml"))
            .merge(Env::prefixed("INKGATE_MCP_"))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn server_url(&self) -> String {
        match &self.server_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}/mcp", self.port),
        }
    }

    pub fn auth_server_url(&self) -> String {
        self.auth_server_url.trim_end_matches('/').to_string()
    }

    pub fn introspection_endpoint(&self) -> String {
        match &self.introspection_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("{}/introspect", self.auth_server_url()),
        }
    }

    pub fn introspection_timeout(&self) -> Duration {
        Duration::from_millis(self.introspection_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_auth_server_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_introspection_timeout_ms() -> u64 {
    5000
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_cache_capacity() -> usize {
    1024
}

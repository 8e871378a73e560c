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

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const PROTECTED_RESOURCE_PATH: &str = "/.well-known/oauth-protected-resource";
const AUTHORIZATION_SERVER_PATH: &str = "/.well-known/oauth-authorization-server";

#[derive(Debug, Clone, Deserialize)]
pub struct ProtectedResourceMetadata {
    pub resource: String,
    #[serde(default)]
    pub authorization_servers: Vec<String>,
    #[serde(default)]
    pub scopes_supported: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub registration_endpoint: Option<String>,
    #[serde(default)]
    pub introspection_endpoint: Option<String>,
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    #[serde(default)]
    pub code_challenge_methods_supported: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Discovery {
    pub resource: ProtectedResourceMetadata,
    pub authorization_server: AuthorizationServerMetadata,
}

/// Resource metadata, then the first listed authorization server's metadata.
pub async fn discover(http: &Client, resource_url: &Url) -> Result<Discovery> {
    let resource = fetch_resource_metadata(http, resource_url).await?;

    let issuer = resource
        .authorization_servers
        .first()
        .context("Protected resource lists no authorization servers")?;
    let issuer = Url::parse(issuer).context("Invalid authorization server URL")?;

    let metadata_url = well_known_url(&issuer, AUTHORIZATION_SERVER_PATH);
    tracing::debug!(url = %metadata_url, "Fetching authorization server metadata");
    let authorization_server: AuthorizationServerMetadata = http
        .get(metadata_url)
        .send()
        .await
        .context("Failed to fetch authorization server metadata")?
        .error_for_status()?
        .json()
        .await
        .context("Invalid authorization server metadata")?;

    Ok(Discovery {
        resource,
        authorization_server,
    })
}

/// Tries the path-suffixed well-known URL first, then the bare one.
async fn fetch_resource_metadata(
    http: &Client,
    resource_url: &Url,
) -> Result<ProtectedResourceMetadata> {
    let candidates = [
        well_known_url(resource_url, PROTECTED_RESOURCE_PATH),
        well_known_url(&origin(resource_url), PROTECTED_RESOURCE_PATH),
    ];

    let mut last_status = None;
    for url in candidates {
        tracing::debug!(url = %url, "Fetching protected resource metadata");
        let response = http
            .get(url)
            .send()
            .await
            .context("Failed to fetch protected resource metadata")?;
        if response.status().is_success() {
            return response
                .json()
                .await
                .context("Invalid protected resource metadata");
        }
        last_status = Some(response.status());
    }

    anyhow::bail!(
        "Protected resource metadata not found (last status: {:?})",
        last_status
    )
}

/// RFC 8414 / RFC 9728 placement: the well-known segment goes between the
/// host and any path component.
pub fn well_known_url(base: &Url, well_known: &str) -> Url {
    let mut url = base.clone();
    let path = base.path().trim_end_matches('/');
    url.set_path(&format!("{}{}", well_known, path));
    url.set_query(None);
    url.set_fragment(None);
    url
}

fn origin(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("/");
    origin
}

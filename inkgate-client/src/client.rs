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

use anyhow::{bail, Context, Result};
use inkgate_core::{generate_code_verifier, generate_secure_token, s256_challenge, ScopeSet};
use reqwest::{header, redirect, Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info};
use url::Url;

use crate::challenge::{parse_challenge, Challenge};
use crate::discovery::{discover, Discovery};

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3031/callback";

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub client_name: String,
    pub redirect_uri: String,
    pub username: String,
    pub password: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            client_name: "Inkgate notebook client".to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            username: "demo_user".to_string(),
            password: "demo_password".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredClient {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub redirect_uris: Vec<String>,
    pub token_endpoint_auth_method: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: String,
}

impl TokenSet {
    pub fn scopes(&self) -> ScopeSet {
        ScopeSet::parse_lenient(&self.scope)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolMeta {
    #[serde(default)]
    pub required_scopes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "_meta")]
    pub meta: ToolMeta,
}

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Authorization challenge ({status}): {}", .challenge.error)]
    Challenge { status: u16, challenge: Challenge },
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Union of the scopes the target tools require. Every target must be
/// present in the listing.
pub fn aggregate_scopes(tools: &[ToolInfo], targets: &[&str]) -> Result<ScopeSet> {
    let mut scopes = ScopeSet::new();
    for target in targets {
        let tool = tools
            .iter()
            .find(|t| t.name == *target)
            .with_context(|| format!("Tool not offered by server: {}", target))?;
        let required = ScopeSet::parse(&tool.meta.required_scopes.join(" "))
            .with_context(|| format!("Tool {} requires an unknown scope", target))?;
        scopes = scopes.union(&required);
    }
    Ok(scopes)
}

/// Decode the JSON payload carried in a tool result's first text block.
pub fn tool_payload(result: &Value) -> Result<Value> {
    let text = result["content"][0]["text"]
        .as_str()
        .context("Tool result has no text content")?;
    if result["isError"].as_bool().unwrap_or(false) {
        bail!("Tool reported an error: {}", text);
    }
    serde_json::from_str(text).context("Tool result is not JSON")
}

/// Headless OAuth client for the notebook MCP server. The login form is
/// posted directly and the code is read from the redirect's `Location`.
pub struct NotebookClient {
    http: Client,
    resource_url: Url,
    options: ClientOptions,
    discovery: Option<Discovery>,
    registration: Option<RegisteredClient>,
    token: Option<TokenSet>,
    next_id: u64,
}

impl NotebookClient {
    pub fn new(resource_url: Url, options: ClientOptions) -> Result<Self> {
        let http = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            resource_url,
            options,
            discovery: None,
            registration: None,
            token: None,
            next_id: 0,
        })
    }

    pub fn token(&self) -> Option<&TokenSet> {
        self.token.as_ref()
    }

    pub async fn discover(&mut self) -> Result<&Discovery> {
        if self.discovery.is_none() {
            let discovery = discover(&self.http, &self.resource_url).await?;
            info!(
                issuer = %discovery.authorization_server.issuer,
                "Discovered authorization server"
            );
            self.discovery = Some(discovery);
        }
        self.discovery.as_ref().context("Discovery did not complete")
    }

    /// Register as a public client (no secret, PKCE only).
    pub async fn register(&mut self) -> Result<RegisteredClient> {
        let endpoint = self
            .discover()
            .await?
            .authorization_server
            .registration_endpoint
            .clone()
            .context("Authorization server does not support registration")?;

        let response = self
            .http
            .post(&endpoint)
            .json(&json!({
                "client_name": self.options.client_name,
                "redirect_uris": [self.options.redirect_uri],
                "grant_types": ["authorization_code"],
                "response_types": ["code"],
                "token_endpoint_auth_method": "none",
            }))
            .send()
            .await
            .context("Failed to send registration request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Registration failed with status {}: {}", status, body);
        }

        let registered: RegisteredClient = response
            .json()
            .await
            .context("Invalid registration response")?;
        info!(client_id = %registered.client_id, "Registered client");
        self.registration = Some(registered.clone());
        Ok(registered)
    }

    /// Run the authorization code flow for `scope` and keep the token.
    pub async fn authorize(&mut self, scope: &ScopeSet) -> Result<TokenSet> {
        let discovery = self.discover().await?.clone();
        let registration = match &self.registration {
            Some(registration) => registration.clone(),
            None => self.register().await?,
        };

        let verifier = generate_code_verifier();
        let state = generate_secure_token(32);
        let form = [
            ("response_type", "code".to_string()),
            ("client_id", registration.client_id.clone()),
            ("redirect_uri", self.options.redirect_uri.clone()),
            ("scope", scope.to_string()),
            ("state", state.clone()),
            ("code_challenge", s256_challenge(&verifier)),
            ("code_challenge_method", "S256".to_string()),
            ("resource", discovery.resource.resource.clone()),
            ("username", self.options.username.clone()),
            ("password", self.options.password.clone()),
        ];

        debug!(scope = %scope, "Submitting authorization request");
        let response = self
            .http
            .post(&discovery.authorization_server.authorization_endpoint)
            .form(&form)
            .send()
            .await
            .context("Failed to send authorization request")?;

        if response.status() != StatusCode::FOUND {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Authorization failed with status {}: {}", status, body);
        }

        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .context("Authorization response has no Location header")?;
        let params: HashMap<String, String> = Url::parse(location)
            .context("Invalid redirect location")?
            .query_pairs()
            .into_owned()
            .collect();

        if let Some(error) = params.get("error") {
            bail!("Authorization denied: {}", error);
        }
        if params.get("state") != Some(&state) {
            bail!("State mismatch in authorization response");
        }
        let code = params
            .get("code")
            .context("Authorization response carries no code")?;

        let token = self
            .exchange(&discovery, &registration, code, &verifier)
            .await?;
        info!(scope = %token.scope, "Obtained access token");
        self.token = Some(token.clone());
        Ok(token)
    }

    async fn exchange(
        &self,
        discovery: &Discovery,
        registration: &RegisteredClient,
        code: &str,
        verifier: &str,
    ) -> Result<TokenSet> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.options.redirect_uri.as_str()),
            ("client_id", registration.client_id.as_str()),
            ("code_verifier", verifier),
        ];
        if let Some(secret) = &registration.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http
            .post(&discovery.authorization_server.token_endpoint)
            .form(&form)
            .send()
            .await
            .context("Failed to send token request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Token exchange failed with status {}: {}", status, body);
        }

        response.json().await.context("Invalid token response")
    }

    pub async fn initialize(&mut self) -> Result<Value, CallError> {
        let result = self
            .rpc(
                "initialize",
                json!({
                    "protocolVersion": "2025-06-18",
                    "capabilities": {},
                    "clientInfo": {
                        "name": "inkgate-client",
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            )
            .await?;

        self.http
            .post(self.resource_url.clone())
            .json(&json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
            .send()
            .await
            .context("Failed to send initialized notification")?;

        Ok(result)
    }

    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, CallError> {
        let result = self.rpc("tools/list", json!({})).await?;
        let tools = serde_json::from_value(result["tools"].clone())
            .context("Invalid tools/list result")?;
        Ok(tools)
    }

    /// Call a tool with the current token, if any. A 401/403 surfaces as
    /// `CallError::Challenge`.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value, CallError> {
        self.rpc("tools/call", json!({ "name": name, "arguments": arguments }))
            .await
    }

    /// Like `call_tool`, but on a challenge re-authorizes once with the
    /// challenged scope and retries.
    pub async fn call_tool_with_step_up(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<Value, CallError> {
        match self.call_tool(name, arguments.clone()).await {
            Err(CallError::Challenge { status, challenge }) => {
                let scope = challenge.scopes();
                if scope.is_empty() {
                    return Err(CallError::Challenge { status, challenge });
                }

                info!(tool = name, status, scope = %scope, "Re-authorizing after challenge");
                self.authorize(&scope).await?;
                self.call_tool(name, arguments).await
            }
            other => other,
        }
    }

    async fn rpc(&mut self, method: &str, params: Value) -> Result<Value, CallError> {
        self.next_id += 1;
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id,
            "method": method,
            "params": params,
        });

        let mut request = self.http.post(self.resource_url.clone()).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(&token.access_token);
        }
        let response = request
            .send()
            .await
            .context("Failed to reach MCP server")?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let challenge = response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_challenge)
                .with_context(|| format!("{} without a bearer challenge", status))?;
            debug!(method, status = status.as_u16(), error = %challenge.error, "Challenged");
            return Err(CallError::Challenge {
                status: status.as_u16(),
                challenge,
            });
        }

        let body: Value = response
            .error_for_status()
            .context("MCP request failed")?
            .json()
            .await
            .context("Invalid JSON-RPC response")?;

        if let Some(error) = body.get("error") {
            return Err(CallError::Rpc {
                code: error["code"].as_i64().unwrap_or_default(),
                message: error["message"].as_str().unwrap_or_default().to_string(),
            });
        }
        Ok(body["result"].clone())
    }
}

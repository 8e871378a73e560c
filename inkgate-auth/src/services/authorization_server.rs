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

//! Authorization-code lifecycle: registration, authorization, redemption and
//! introspection. HTTP handlers are thin wrappers over this type.

use anyhow::Result;
use chrono::{Duration, Utc};
use inkgate_core::{
    generate_secure_token, AccessToken, AuthorizationCode, IntrospectionRecord, OAuthClient,
    OAuthError, PkceChallenge, ScopeSet, AUTH_METHOD_NONE, AUTH_METHOD_SECRET_BASIC,
    AUTH_METHOD_SECRET_POST,
};
use inkgate_db::{ClientStore, CodeStore, TokenStore};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::authenticator::{Authenticator, Credentials};
use crate::oauth2::{
    authorization::AuthorizeRequest,
    client_registration::{
        hash_client_secret, is_valid_redirect_uri, verify_client_secret,
        ClientRegistrationRequest, ClientRegistrationResponse,
    },
    token::{ClientCredentials, TokenRequest, TokenResponse},
};

const SUPPORTED_GRANT_TYPES: [&str; 2] = ["authorization_code", "refresh_token"];
const SUPPORTED_AUTH_METHODS: [&str; 3] = [
    AUTH_METHOD_NONE,
    AUTH_METHOD_SECRET_POST,
    AUTH_METHOD_SECRET_BASIC,
];

/// Authorization parameters that passed every check short of authenticating
/// the resource owner.
#[derive(Debug, Clone)]
pub struct ValidatedAuthorization {
    pub client: OAuthClient,
    pub redirect_uri: String,
    pub scope: ScopeSet,
    pub pkce: PkceChallenge,
    pub resource: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthorizationGrant {
    pub code: String,
    pub redirect_url: String,
}

pub struct AuthorizationServer {
    clients: Arc<dyn ClientStore>,
    codes: Arc<dyn CodeStore>,
    tokens: Arc<dyn TokenStore>,
    authenticator: Arc<dyn Authenticator>,
    code_lifetime: Duration,
    token_lifetime: Duration,
}

impl AuthorizationServer {
    pub fn new(
        clients: Arc<dyn ClientStore>,
        codes: Arc<dyn CodeStore>,
        tokens: Arc<dyn TokenStore>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            clients,
            codes,
            tokens,
            authenticator,
            code_lifetime: Duration::minutes(5),
            token_lifetime: Duration::hours(1),
        }
    }

    pub fn with_lifetimes(mut self, code_lifetime: Duration, token_lifetime: Duration) -> Self {
        self.code_lifetime = code_lifetime;
        self.token_lifetime = token_lifetime;
        self
    }

    /// Dynamic client registration (RFC 7591).
    pub async fn register_client(
        &self,
        request: ClientRegistrationRequest,
    ) -> Result<ClientRegistrationResponse, OAuthError> {
        if request.redirect_uris.is_empty() {
            return Err(OAuthError::invalid_request(
                "redirect_uris must contain at least one URI",
            ));
        }

        if let Some(uri) = request
            .redirect_uris
            .iter()
            .find(|uri| !is_valid_redirect_uri(uri))
        {
            return Err(OAuthError::invalid_request(&format!(
                "Invalid redirect_uri: {}",
                uri
            )));
        }

        let grant_types = if request.grant_types.is_empty() {
            vec!["authorization_code".to_string()]
        } else {
            request.grant_types
        };
        if let Some(grant_type) = grant_types
            .iter()
            .find(|g| !SUPPORTED_GRANT_TYPES.contains(&g.as_str()))
        {
            return Err(OAuthError::invalid_request(&format!(
                "Unsupported grant_type: {}",
                grant_type
            )));
        }

        let response_types = if request.response_types.is_empty() {
            vec!["code".to_string()]
        } else {
            request.response_types
        };
        if let Some(response_type) = response_types.iter().find(|r| r.as_str() != "code") {
            return Err(OAuthError::invalid_request(&format!(
                "Unsupported response_type: {}",
                response_type
            )));
        }

        if !SUPPORTED_AUTH_METHODS.contains(&request.token_endpoint_auth_method.as_str()) {
            return Err(OAuthError::invalid_request(&format!(
                "Unsupported token_endpoint_auth_method: {}",
                request.token_endpoint_auth_method
            )));
        }

        let scope = match request.scope.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(
                ScopeSet::parse(raw).map_err(|e| OAuthError::invalid_scope(&e.to_string()))?,
            ),
            _ => None,
        };

        let client_name = request
            .client_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "Unnamed client".to_string());

        let mut client = OAuthClient::new(client_name, request.redirect_uris);
        client.grant_types = grant_types;
        client.response_types = response_types;
        client.scope = scope;
        client.token_endpoint_auth_method = request.token_endpoint_auth_method;

        let client_secret = if client.is_confidential() {
            let secret = generate_secure_token(32);
            client.client_secret_hash = Some(
                hash_client_secret(&secret).map_err(|e| server_error("hash client secret", e))?,
            );
            Some(secret)
        } else {
            None
        };

        self.clients
            .put(client.clone())
            .await
            .map_err(|e| server_error("store client", e))?;

        info!(
            client_id = %client.client_id,
            client_name = %client.client_name,
            auth_method = %client.token_endpoint_auth_method,
            "Registered OAuth client"
        );

        Ok(ClientRegistrationResponse::new(client, client_secret))
    }

    /// Check an authorization request without touching any credentials.
    pub async fn validate_authorization(
        &self,
        request: &AuthorizeRequest,
    ) -> Result<ValidatedAuthorization, OAuthError> {
        let client = self
            .clients
            .get(&request.client_id)
            .await
            .map_err(|e| server_error("load client", e))?
            .ok_or_else(|| OAuthError::invalid_client("Unknown client_id"))?;

        let redirect_uri = match request.redirect_uri.as_deref() {
            Some(uri) if client.validate_redirect_uri(uri) => uri.to_string(),
            Some(_) => {
                return Err(OAuthError::invalid_client(
                    "redirect_uri is not registered for this client",
                ))
            }
            None if client.redirect_uris.len() == 1 => client.redirect_uris[0].clone(),
            None => return Err(OAuthError::invalid_request("redirect_uri is required")),
        };

        match request.response_type.as_deref() {
            Some("code") => {}
            Some(other) => {
                return Err(OAuthError::unsupported_response_type(&format!(
                    "Response type '{}' is not supported",
                    other
                )))
            }
            None => return Err(OAuthError::invalid_request("response_type is required")),
        }

        let scope = match request.scope.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                ScopeSet::parse(raw).map_err(|e| OAuthError::invalid_scope(&e.to_string()))?
            }
            _ => return Err(OAuthError::invalid_request("scope is required")),
        };
        if !client.allows_scope(&scope) {
            return Err(OAuthError::invalid_scope(
                "Requested scope exceeds the client's registered scope",
            ));
        }

        let pkce = PkceChallenge::from_request(
            request.code_challenge.as_deref(),
            request.code_challenge_method.as_deref(),
        )?;

        let resource = match request.resource.as_deref() {
            Some(raw) => Some(validate_resource(raw)?),
            None => None,
        };

        Ok(ValidatedAuthorization {
            client,
            redirect_uri,
            scope,
            pkce,
            resource,
            state: request.state.clone(),
        })
    }

    /// Authenticate the resource owner and issue a code. A rejected login
    /// stores nothing.
    pub async fn authorize(
        &self,
        request: &AuthorizeRequest,
        credentials: &Credentials,
    ) -> Result<AuthorizationGrant, OAuthError> {
        let validated = self.validate_authorization(request).await?;
        self.complete_authorization(validated, credentials).await
    }

    /// Second half of `authorize`, for callers that already validated the
    /// request (the login form re-renders with the validated client).
    pub async fn complete_authorization(
        &self,
        validated: ValidatedAuthorization,
        credentials: &Credentials,
    ) -> Result<AuthorizationGrant, OAuthError> {
        let subject = self
            .authenticator
            .authenticate(credentials)
            .await
            .ok_or_else(|| OAuthError::access_denied("Invalid credentials"))?;

        let code = AuthorizationCode::new(
            validated.client.client_id.clone(),
            validated.redirect_uri.clone(),
            validated.scope.clone(),
            validated.pkce,
            subject,
            validated.resource,
            self.code_lifetime,
        );
        let redirect_url = build_redirect_url(
            &validated.redirect_uri,
            &code.code,
            validated.state.as_deref(),
        )?;
        let issued = code.code.clone();

        self.codes
            .put(code)
            .await
            .map_err(|e| server_error("store authorization code", e))?;

        info!(
            client_id = %validated.client.client_id,
            scope = %validated.scope,
            "Issued authorization code"
        );

        Ok(AuthorizationGrant {
            code: issued,
            redirect_url,
        })
    }

    /// Redeem an authorization code for an access token.
    pub async fn exchange(
        &self,
        request: TokenRequest,
        credentials: ClientCredentials,
    ) -> Result<TokenResponse, OAuthError> {
        if request.grant_type.is_empty() {
            return Err(OAuthError::invalid_request("grant_type is required"));
        }
        if request.grant_type != "authorization_code" {
            return Err(OAuthError::unsupported_grant_type(&format!(
                "Grant type '{}' is not supported",
                request.grant_type
            )));
        }

        let code = required(request.code, "code")?;
        let client_id = required(credentials.client_id, "client_id")?;
        let code_verifier = required(request.code_verifier, "code_verifier")?;

        let client = self
            .clients
            .get(&client_id)
            .await
            .map_err(|e| server_error("load client", e))?
            .ok_or_else(|| OAuthError::invalid_client("Unknown client"))?;

        if let Some(secret_hash) = &client.client_secret_hash {
            let secret = credentials
                .client_secret
                .ok_or_else(|| OAuthError::invalid_client("client_secret is required"))?;
            if !verify_client_secret(&secret, secret_hash) {
                return Err(OAuthError::invalid_client("Invalid client credentials"));
            }
        }

        let now = Utc::now();
        let record = self
            .codes
            .get(&code)
            .await
            .map_err(|e| server_error("load authorization code", e))?
            .ok_or_else(|| OAuthError::invalid_grant("Invalid authorization code"))?;

        if !record.is_valid_at(now) {
            return Err(OAuthError::invalid_grant(
                "Authorization code has expired or already been used",
            ));
        }
        if record.client_id != client.client_id {
            return Err(OAuthError::invalid_grant(
                "Authorization code was issued to another client",
            ));
        }
        if let Some(redirect_uri) = &request.redirect_uri {
            if *redirect_uri != record.redirect_uri {
                return Err(OAuthError::invalid_grant("redirect_uri does not match"));
            }
        }
        if !record.pkce.verify(&code_verifier) {
            return Err(OAuthError::invalid_grant("Invalid code_verifier"));
        }

        // Losing a concurrent redemption looks the same as presenting a used code.
        let record = self
            .codes
            .consume(&code, now)
            .await
            .map_err(|e| server_error("consume authorization code", e))?
            .ok_or_else(|| {
                OAuthError::invalid_grant("Authorization code has expired or already been used")
            })?;

        let scope = record.scope.to_string();
        let (access_token, token) = AccessToken::issue(
            record.client_id,
            record.subject,
            record.scope,
            record.resource,
            self.token_lifetime,
        );
        self.tokens
            .put(token)
            .await
            .map_err(|e| server_error("store access token", e))?;

        info!(client_id = %client.client_id, scope = %scope, "Issued access token");

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_lifetime.num_seconds(),
            scope,
        })
    }

    /// RFC 7662 introspection. Store failures read as inactive.
    pub async fn introspect(&self, token: &str) -> IntrospectionRecord {
        match self.tokens.get(token).await {
            Ok(Some(stored)) => stored.introspect_at(Utc::now()),
            Ok(None) => {
                debug!("Introspection of unknown token");
                IntrospectionRecord::inactive()
            }
            Err(e) => {
                error!("Failed to load access token for introspection: {:?}", e);
                IntrospectionRecord::inactive()
            }
        }
    }

    /// Remove expired codes and tokens. Returns (codes, tokens) removed.
    pub async fn purge_expired(&self) -> Result<(usize, usize)> {
        let now = Utc::now();
        let codes = self.codes.purge_expired(now).await?;
        let tokens = self.tokens.purge_expired(now).await?;
        Ok((codes, tokens))
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, OAuthError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OAuthError::invalid_request(&format!("{} is required", name)))
}

fn server_error(action: &str, err: anyhow::Error) -> OAuthError {
    error!("Failed to {}: {:?}", action, err);
    OAuthError::server_error(&format!("Failed to {}", action))
}

/// RFC 8707 resource indicators are absolute URIs without a fragment.
fn validate_resource(raw: &str) -> Result<String, OAuthError> {
    match url::Url::parse(raw) {
        Ok(url) if url.fragment().is_none() => Ok(raw.to_string()),
        _ => Err(OAuthError::invalid_request(
            "resource must be an absolute URI without a fragment",
        )),
    }
}

fn build_redirect_url(
    redirect_uri: &str,
    code: &str,
    state: Option<&str>,
) -> Result<String, OAuthError> {
    let mut url = url::Url::parse(redirect_uri)
        .map_err(|_| OAuthError::invalid_request("Invalid redirect_uri"))?;

    url.query_pairs_mut().append_pair("code", code);
    if let Some(state) = state {
        url.query_pairs_mut().append_pair("state", state);
    }

    Ok(url.to_string())
}

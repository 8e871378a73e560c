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

use anyhow::Result;
use inkgate_core::{generate_code_verifier, s256_challenge, AUTH_METHOD_NONE};

use crate::{
    authenticator::Credentials,
    config::Config,
    oauth2::{
        authorization::AuthorizeRequest,
        client_registration::ClientRegistrationRequest,
        token::{ClientCredentials, TokenRequest},
    },
    state::AppState,
};

pub const TEST_REDIRECT_URI: &str = "http://localhost:3031/callback";

pub fn create_test_app_state() -> Result<AppState> {
    AppState::in_memory(Config::default())
}

/// Register a public client and return its id.
pub async fn register_test_client(state: &AppState) -> Result<String> {
    let response = state
        .server
        .register_client(ClientRegistrationRequest {
            client_name: Some("Test client".to_string()),
            redirect_uris: vec![TEST_REDIRECT_URI.to_string()],
            grant_types: vec![],
            response_types: vec![],
            scope: None,
            token_endpoint_auth_method: AUTH_METHOD_NONE.to_string(),
        })
        .await?;
    Ok(response.client_id)
}

/// Run the login step with the demo credentials. Returns (code, verifier).
pub async fn authorize_test_client(
    state: &AppState,
    client_id: &str,
    scope: &str,
) -> Result<(String, String)> {
    let verifier = generate_code_verifier();
    let request = AuthorizeRequest {
        response_type: Some("code".to_string()),
        client_id: client_id.to_string(),
        redirect_uri: Some(TEST_REDIRECT_URI.to_string()),
        scope: Some(scope.to_string()),
        state: Some("test-state".to_string()),
        code_challenge: Some(s256_challenge(&verifier)),
        code_challenge_method: Some("S256".to_string()),
        resource: None,
    };
    let credentials = Credentials {
        username: state.config.demo_username.clone(),
        password: state.config.demo_password.clone(),
    };

    let grant = state.server.authorize(&request, &credentials).await?;
    Ok((grant.code, verifier))
}

/// Redeem a code for a public client and return the raw access token.
pub async fn exchange_test_code(
    state: &AppState,
    client_id: &str,
    code: &str,
    verifier: &str,
) -> Result<String> {
    let request = TokenRequest {
        grant_type: "authorization_code".to_string(),
        code: Some(code.to_string()),
        redirect_uri: Some(TEST_REDIRECT_URI.to_string()),
        client_id: Some(client_id.to_string()),
        client_secret: None,
        code_verifier: Some(verifier.to_string()),
    };
    let credentials = ClientCredentials {
        client_id: Some(client_id.to_string()),
        client_secret: None,
    };

    Ok(state.server.exchange(request, credentials).await?.access_token)
}

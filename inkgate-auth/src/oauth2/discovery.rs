use axum::{extract::State, Json};
use inkgate_core::{Scope, AUTH_METHOD_NONE, AUTH_METHOD_SECRET_BASIC, AUTH_METHOD_SECRET_POST};
use serde_json::{json, Value};

use crate::state::AppState;

/// RFC 8414 authorization server metadata for the given issuer.
pub fn authorization_server_metadata(issuer: &str) -> Value {
    let scopes: Vec<&str> = Scope::ALL.iter().map(Scope::as_str).collect();

    json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{}/authorize", issuer),
        "token_endpoint": format!("{}/token", issuer),
        "registration_endpoint": format!("{}/register", issuer),
        "introspection_endpoint": format!("{}/introspect", issuer),
        "scopes_supported": scopes,
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code"],
        "code_challenge_methods_supported": ["S256"],
        "token_endpoint_auth_methods_supported": [
            AUTH_METHOD_NONE,
            AUTH_METHOD_SECRET_POST,
            AUTH_METHOD_SECRET_BASIC,
        ],
    })
}

/// OAuth2 Authorization Server Metadata
pub async fn oauth_authorization_server_handler(State(state): State<AppState>) -> Json<Value> {
    Json(state.metadata.as_ref().clone())
}

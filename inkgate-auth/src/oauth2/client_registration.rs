use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use inkgate_core::{OAuthClient, OAuthError};
use serde::{Deserialize, Serialize};

use super::errors::OAuthErrorResponse;
use crate::state::AppState;

/// Dynamic Client Registration Request
#[derive(Debug, Clone, Deserialize)]
pub struct ClientRegistrationRequest {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub grant_types: Vec<String>,
    #[serde(default)]
    pub response_types: Vec<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_token_auth_method")]
    pub token_endpoint_auth_method: String,
}

fn default_token_auth_method() -> String {
    "client_secret_basic".to_string()
}

/// Dynamic Client Registration Response
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientRegistrationResponse {
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub client_name: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub token_endpoint_auth_method: String,
    pub client_id_issued_at: i64,
    pub client_secret_expires_at: i64,
}

impl ClientRegistrationResponse {
    pub fn new(client: OAuthClient, client_secret: Option<String>) -> Self {
        Self {
            client_id: client.client_id,
            client_secret,
            client_name: client.client_name,
            redirect_uris: client.redirect_uris,
            grant_types: client.grant_types,
            response_types: client.response_types,
            scope: client.scope.map(|s| s.to_string()),
            token_endpoint_auth_method: client.token_endpoint_auth_method,
            client_id_issued_at: client.created_at.timestamp(),
            client_secret_expires_at: 0, // Never expires
        }
    }
}

/// Dynamic Client Registration endpoint
/// https://datatracker.ietf.org/doc/html/rfc7591
pub async fn client_registration_handler(
    State(state): State<AppState>,
    payload: Result<Json<ClientRegistrationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return OAuthErrorResponse(OAuthError::invalid_request(&rejection.body_text()))
                .into_response()
        }
    };

    match state.server.register_client(request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(err) => OAuthErrorResponse(err).into_response(),
    }
}

/// Absolute URI, no fragment, and a host for web schemes.
pub fn is_valid_redirect_uri(uri: &str) -> bool {
    match url::Url::parse(uri) {
        Ok(url) => {
            if url.fragment().is_some() {
                return false;
            }
            if matches!(url.scheme(), "http" | "https") && url.host().is_none() {
                return false;
            }
            true
        }
        Err(_) => false,
    }
}

/// Hash client secret using Argon2
pub fn hash_client_secret(secret: &str) -> anyhow::Result<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
        Argon2,
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Argon2 hashing failed: {}", e))?;

    Ok(hash.to_string())
}

/// Verify client secret
pub fn verify_client_secret(secret: &str, hash: &str) -> bool {
    use argon2::{password_hash::PasswordVerifier, Argon2};

    let parsed_hash = match argon2::PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_app_state;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    #[test]
    fn test_redirect_uri_validation() {
        assert!(is_valid_redirect_uri("http://localhost:3000/callback"));
        assert!(is_valid_redirect_uri("http://127.0.0.1:8080"));
        assert!(is_valid_redirect_uri("https://example.com/callback"));
        assert!(is_valid_redirect_uri("com.example.app:/oauth"));

        assert!(!is_valid_redirect_uri(""));
        assert!(!is_valid_redirect_uri("not-a-url"));
        assert!(!is_valid_redirect_uri("/relative/callback"));
        assert!(!is_valid_redirect_uri(
            "https://example.com/callback#fragment"
        ));
    }

    #[test]
    fn test_client_secret_hashing() -> anyhow::Result<()> {
        let hash = hash_client_secret("test_secret_123")?;

        assert!(verify_client_secret("test_secret_123", &hash));
        assert!(!verify_client_secret("wrong_secret", &hash));
        assert!(!verify_client_secret("test_secret_123", "not-a-phc-string"));
        Ok(())
    }

    async fn register(body: serde_json::Value) -> anyhow::Result<(StatusCode, serde_json::Value)> {
        let app = crate::routes::create_router(create_test_app_state()?);
        let request = Request::builder()
            .method("POST")
            .uri("/register")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?;

        let response = app.oneshot(request).await?;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&body)?))
    }

    #[tokio::test]
    async fn test_register_public_client() -> anyhow::Result<()> {
        let (status, json) = register(json!({
            "client_name": "Notebook client",
            "redirect_uris": ["http://localhost:3031/callback"],
            "token_endpoint_auth_method": "none",
            "scope": "write read"
        }))
        .await?;

        assert_eq!(status, StatusCode::CREATED);
        assert!(json["client_id"].as_str().unwrap().starts_with("inkgate_"));
        assert!(json.get("client_secret").is_none());
        assert_eq!(json["scope"], "read write");
        assert_eq!(json["grant_types"], json!(["authorization_code"]));
        assert_eq!(json["client_secret_expires_at"], 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_confidential_client_gets_secret() -> anyhow::Result<()> {
        let (status, json) = register(json!({
            "client_name": "Backend",
            "redirect_uris": ["https://app.example.com/cb"]
        }))
        .await?;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["token_endpoint_auth_method"], "client_secret_basic");
        assert_eq!(json["client_secret"].as_str().unwrap().len(), 32);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_rejects_missing_redirects() -> anyhow::Result<()> {
        let (status, json) = register(json!({ "client_name": "x" })).await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_request");
        Ok(())
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_json() -> anyhow::Result<()> {
        let app = crate::routes::create_router(create_test_app_state()?);
        let request = Request::builder()
            .method("POST")
            .uri("/register")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))?;

        let response = app.oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(json["error"], "invalid_request");
        Ok(())
    }
}

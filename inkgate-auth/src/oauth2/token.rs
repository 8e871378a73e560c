use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use axum_extra::{
    headers::{authorization::Basic, Authorization},
    TypedHeader,
};
use serde::{Deserialize, Serialize};

use super::errors::OAuthErrorResponse;
use crate::state::AppState;

/// Token request
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub code_verifier: Option<String>,
}

/// Token response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
}

/// Client identity as presented at the token endpoint.
#[derive(Debug, Clone, Default)]
pub struct ClientCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// OAuth2 token endpoint
pub async fn token_handler(
    State(state): State<AppState>,
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    Form(request): Form<TokenRequest>,
) -> Response {
    let credentials = extract_client_credentials(auth_header, &request);

    match state.server.exchange(request, credentials).await {
        Ok(response) => (
            StatusCode::OK,
            [(header::CACHE_CONTROL, "no-store")],
            Json(response),
        )
            .into_response(),
        Err(err) => OAuthErrorResponse(err).into_response(),
    }
}

/// HTTP Basic takes precedence over credentials in the form body.
pub fn extract_client_credentials(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    request: &TokenRequest,
) -> ClientCredentials {
    match auth_header {
        Some(TypedHeader(auth)) => ClientCredentials {
            client_id: Some(auth.username().to_string()),
            client_secret: Some(auth.password().to_string()),
        },
        None => ClientCredentials {
            client_id: request.client_id.clone(),
            client_secret: request.client_secret.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        authorize_test_client, create_test_app_state, register_test_client, TEST_REDIRECT_URI,
    };
    use axum::body::Body;
    use axum::http::Request;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use tower::ServiceExt;

    fn token_form(client_id: &str, code: &str, verifier: &str) -> String {
        serde_urlencoded::to_string([
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", TEST_REDIRECT_URI),
            ("client_id", client_id),
            ("code_verifier", verifier),
        ])
        .unwrap()
    }

    async fn post_token(
        app: axum::Router,
        body: String,
        basic: Option<(&str, &str)>,
    ) -> anyhow::Result<(StatusCode, serde_json::Value)> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/token")
            .header("content-type", "application/x-www-form-urlencoded");
        if let Some((user, pass)) = basic {
            let encoded = STANDARD.encode(format!("{}:{}", user, pass));
            builder = builder.header("authorization", format!("Basic {}", encoded));
        }

        let response = app.oneshot(builder.body(Body::from(body))?).await?;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&body)?))
    }

    #[tokio::test]
    async fn test_token_exchange_and_replay() -> anyhow::Result<()> {
        let state = create_test_app_state()?;
        let client_id = register_test_client(&state).await?;
        let (code, verifier) = authorize_test_client(&state, &client_id, "read write").await?;
        let app = crate::routes::create_router(state);

        let (status, json) =
            post_token(app.clone(), token_form(&client_id, &code, &verifier), None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["scope"], "read write");
        assert_eq!(json["expires_in"], 3600);
        assert!(json["access_token"].as_str().unwrap().starts_with("it_"));

        let (status, json) = post_token(app, token_form(&client_id, &code, &verifier), None).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_grant");
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_verifier_is_invalid_grant() -> anyhow::Result<()> {
        let state = create_test_app_state()?;
        let client_id = register_test_client(&state).await?;
        let (code, _) = authorize_test_client(&state, &client_id, "read").await?;
        let app = crate::routes::create_router(state);

        let wrong = inkgate_core::generate_code_verifier();
        let (status, json) = post_token(app, token_form(&client_id, &code, &wrong), None).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_grant");
        Ok(())
    }

    #[tokio::test]
    async fn test_unsupported_grant_type() -> anyhow::Result<()> {
        let app = crate::routes::create_router(create_test_app_state()?);
        let body = "grant_type=client_credentials&client_id=x".to_string();

        let (status, json) = post_token(app, body, None).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "unsupported_grant_type");
        Ok(())
    }

    #[tokio::test]
    async fn test_confidential_client_with_basic_auth() -> anyhow::Result<()> {
        let state = create_test_app_state()?;
        let registration = state
            .server
            .register_client(super::super::client_registration::ClientRegistrationRequest {
                client_name: Some("Backend".to_string()),
                redirect_uris: vec![TEST_REDIRECT_URI.to_string()],
                grant_types: vec![],
                response_types: vec![],
                scope: None,
                token_endpoint_auth_method: "client_secret_basic".to_string(),
            })
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        let secret = registration.client_secret.clone().unwrap();
        let (code, verifier) =
            authorize_test_client(&state, &registration.client_id, "write").await?;
        let app = crate::routes::create_router(state);

        let body = serde_urlencoded::to_string([
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("code_verifier", verifier.as_str()),
        ])?;

        let (status, json) = post_token(
            app.clone(),
            body.clone(),
            Some((registration.client_id.as_str(), "wrong")),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_client");

        let (status, json) =
            post_token(app, body, Some((registration.client_id.as_str(), secret.as_str()))).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["scope"], "write");
        Ok(())
    }

    #[test]
    fn test_form_credentials_used_without_basic_header() {
        let request = TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: None,
            redirect_uri: None,
            client_id: Some("c1".to_string()),
            client_secret: Some("s1".to_string()),
            code_verifier: None,
        };

        let credentials = extract_client_credentials(None, &request);
        assert_eq!(credentials.client_id.as_deref(), Some("c1"));
        assert_eq!(credentials.client_secret.as_deref(), Some("s1"));
    }
}

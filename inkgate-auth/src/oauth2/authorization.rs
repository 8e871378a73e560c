use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use tera::Context;

use super::errors::OAuthErrorResponse;
use crate::{
    authenticator::Credentials, error::AppError, services::ValidatedAuthorization,
    state::AppState,
};

/// Authorization request parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    #[serde(default)]
    pub response_type: Option<String>,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub code_challenge: Option<String>,
    #[serde(default)]
    pub code_challenge_method: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
}

impl AuthorizeRequest {
    /// Parameters carried through the login form as hidden inputs.
    fn hidden_fields(&self) -> Vec<HiddenField> {
        let optional = [
            ("response_type", &self.response_type),
            ("redirect_uri", &self.redirect_uri),
            ("scope", &self.scope),
            ("state", &self.state),
            ("code_challenge", &self.code_challenge),
            ("code_challenge_method", &self.code_challenge_method),
            ("resource", &self.resource),
        ];

        std::iter::once(HiddenField::new("client_id", &self.client_id))
            .chain(
                optional
                    .into_iter()
                    .filter_map(|(name, value)| value.as_deref().map(|v| HiddenField::new(name, v))),
            )
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct HiddenField {
    name: &'static str,
    value: String,
}

impl HiddenField {
    fn new(name: &'static str, value: &str) -> Self {
        Self {
            name,
            value: value.to_string(),
        }
    }
}

/// Login form submission
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(flatten)]
    pub request: AuthorizeRequest,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// OAuth2 authorization endpoint. Renders the credential prompt.
pub async fn authorization_handler(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeRequest>,
) -> Result<Response, AppError> {
    match state.server.validate_authorization(&params).await {
        Ok(validated) => render_login(&state, &params, &validated, None, StatusCode::OK),
        Err(err) => Ok(OAuthErrorResponse(err).into_response()),
    }
}

/// Handle the login form. Success redirects back to the client with the code.
pub async fn login_handler(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let validated = match state.server.validate_authorization(&form.request).await {
        Ok(validated) => validated,
        Err(err) => return Ok(OAuthErrorResponse(err).into_response()),
    };

    let credentials = Credentials {
        username: form.username,
        password: form.password,
    };

    match state
        .server
        .complete_authorization(validated.clone(), &credentials)
        .await
    {
        Ok(grant) => Ok((StatusCode::FOUND, [(header::LOCATION, grant.redirect_url)]).into_response()),
        Err(err) if err.is("access_denied") => render_login(
            &state,
            &form.request,
            &validated,
            Some("Invalid username or password"),
            StatusCode::UNAUTHORIZED,
        ),
        Err(err) => Ok(OAuthErrorResponse(err).into_response()),
    }
}

fn render_login(
    state: &AppState,
    params: &AuthorizeRequest,
    validated: &ValidatedAuthorization,
    error: Option<&str>,
    status: StatusCode,
) -> Result<Response, AppError> {
    let mut context = Context::new();
    context.insert("client_name", &validated.client.client_name);
    context.insert("scope", &validated.scope.to_string());
    context.insert("username", &state.config.demo_username);
    context.insert("hidden_fields", &params.hidden_fields());
    context.insert("error", &error);

    let html = state.templates.render("login.html", &context).map_err(|e| {
        tracing::error!("Failed to render login.html: {}", e);
        AppError::from(e)
    })?;

    Ok((status, Html(html)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_test_app_state, register_test_client, TEST_REDIRECT_URI};
    use axum::body::Body;
    use axum::http::Request;
    use inkgate_core::{generate_code_verifier, s256_challenge};
    use tower::ServiceExt;

    fn login_body(client_id: &str, password: &str, verifier: &str) -> String {
        let challenge = s256_challenge(verifier);
        serde_urlencoded::to_string([
            ("response_type", "code"),
            ("client_id", client_id),
            ("redirect_uri", TEST_REDIRECT_URI),
            ("scope", "read"),
            ("state", "abc123"),
            ("code_challenge", challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("username", "demo_user"),
            ("password", password),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_authorize_renders_login_form() -> anyhow::Result<()> {
        let state = create_test_app_state()?;
        let client_id = register_test_client(&state).await?;
        let app = crate::routes::create_router(state);

        let challenge = s256_challenge(&generate_code_verifier());
        let query = serde_urlencoded::to_string([
            ("response_type", "code"),
            ("client_id", client_id.as_str()),
            ("redirect_uri", TEST_REDIRECT_URI),
            ("scope", "read write"),
            ("state", "<script>"),
            ("code_challenge", challenge.as_str()),
        ])?;
        let request = Request::builder()
            .uri(format!("/authorize?{}", query))
            .body(Body::empty())?;

        let response = app.oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let html = String::from_utf8(body.to_vec())?;
        assert!(html.contains("read write"));
        assert!(html.contains(r#"name="client_id""#));
        assert!(html.contains(r#"name="password""#));
        assert!(!html.contains("<script>"));
        Ok(())
    }

    #[tokio::test]
    async fn test_authorize_unknown_client_is_json_error() -> anyhow::Result<()> {
        let app = crate::routes::create_router(create_test_app_state()?);
        let request = Request::builder()
            .uri("/authorize?response_type=code&client_id=nobody&scope=read&code_challenge=x")
            .body(Body::empty())?;

        let response = app.oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(json["error"], "invalid_client");
        Ok(())
    }

    #[tokio::test]
    async fn test_login_redirects_with_code_and_state() -> anyhow::Result<()> {
        let state = create_test_app_state()?;
        let client_id = register_test_client(&state).await?;
        let app = crate::routes::create_router(state);

        let request = Request::builder()
            .method("POST")
            .uri("/authorize")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(login_body(&client_id, "demo_password", &generate_code_verifier())))?;

        let response = app.oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::FOUND);

        let location = response.headers()[header::LOCATION].to_str()?;
        let url = url::Url::parse(location)?;
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert!(pairs["code"].starts_with("ic_"));
        assert_eq!(pairs["state"], "abc123");
        Ok(())
    }

    #[tokio::test]
    async fn test_login_with_bad_password_rerenders_form() -> anyhow::Result<()> {
        let state = create_test_app_state()?;
        let client_id = register_test_client(&state).await?;
        let app = crate::routes::create_router(state);

        let request = Request::builder()
            .method("POST")
            .uri("/authorize")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(login_body(&client_id, "guess", &generate_code_verifier())))?;

        let response = app.oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::LOCATION).is_none());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let html = String::from_utf8(body.to_vec())?;
        assert!(html.contains("Invalid username or password"));
        Ok(())
    }

    #[test]
    fn test_hidden_fields_skip_absent_parameters() {
        let request = AuthorizeRequest {
            client_id: "c1".to_string(),
            scope: Some("read".to_string()),
            ..AuthorizeRequest::default()
        };

        let names: Vec<&str> = request.hidden_fields().iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["client_id", "scope"]);
    }
}

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Form, Json,
};
use inkgate_core::OAuthError;
use serde::Deserialize;

use super::errors::OAuthErrorResponse;
use crate::state::AppState;

/// RFC 7662 introspection request
#[derive(Debug, Deserialize)]
pub struct IntrospectionRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub token_type_hint: Option<String>,
}

/// Token introspection endpoint. Unknown and expired tokens yield only
/// `{"active": false}`.
pub async fn introspection_handler(
    State(state): State<AppState>,
    Form(request): Form<IntrospectionRequest>,
) -> Response {
    if request.token.is_empty() {
        return OAuthErrorResponse(OAuthError::invalid_request("token is required"))
            .into_response();
    }

    if let Some(hint) = request.token_type_hint.as_deref() {
        tracing::debug!(hint, "Introspection token_type_hint ignored");
    }

    Json(state.server.introspect(&request.token).await).into_response()
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use inkgate_core::OAuthError;

/// OAuth2 error response
#[derive(Debug)]
pub struct OAuthErrorResponse(pub OAuthError);

impl OAuthErrorResponse {
    pub fn status(&self) -> StatusCode {
        match self.0.error.as_str() {
            "server_error" => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<OAuthError> for OAuthErrorResponse {
    fn from(err: OAuthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for OAuthErrorResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(
            error = %self.0.error,
            description = ?self.0.error_description,
            "OAuth request rejected"
        );
        (status, Json(self.0)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_errors_are_bad_request() -> anyhow::Result<()> {
        let response = OAuthErrorResponse(OAuthError::invalid_grant("Code already used")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(json["error"], "invalid_grant");
        assert_eq!(json["error_description"], "Code already used");
        assert!(json.get("error_uri").is_none());
        Ok(())
    }

    #[test]
    fn test_server_error_status() {
        let response = OAuthErrorResponse(OAuthError::server_error("store down"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            OAuthErrorResponse(OAuthError::invalid_client("Unknown client")).status(),
            StatusCode::BAD_REQUEST
        );
    }
}

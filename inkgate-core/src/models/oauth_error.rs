use serde::{Deserialize, Serialize};
use std::fmt;

/// OAuth2 error response (RFC 6749 section 5.2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

impl OAuthError {
    fn with_code(error: &str, description: &str) -> Self {
        Self {
            error: error.to_string(),
            error_description: Some(description.to_string()),
            error_uri: None,
        }
    }

    pub fn invalid_request(description: &str) -> Self {
        Self::with_code("invalid_request", description)
    }

    pub fn invalid_client(description: &str) -> Self {
        Self::with_code("invalid_client", description)
    }

    pub fn invalid_grant(description: &str) -> Self {
        Self::with_code("invalid_grant", description)
    }

    pub fn invalid_scope(description: &str) -> Self {
        Self::with_code("invalid_scope", description)
    }

    pub fn access_denied(description: &str) -> Self {
        Self::with_code("access_denied", description)
    }

    pub fn unsupported_grant_type(description: &str) -> Self {
        Self::with_code("unsupported_grant_type", description)
    }

    pub fn unsupported_response_type(description: &str) -> Self {
        Self::with_code("unsupported_response_type", description)
    }

    pub fn server_error(description: &str) -> Self {
        Self::with_code("server_error", description)
    }

    pub fn is(&self, code: &str) -> bool {
        self.error == code
    }
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthError {}

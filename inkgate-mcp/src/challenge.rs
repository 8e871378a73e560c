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

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use inkgate_core::Scope;
use serde_json::json;

use crate::decision::DenyKind;

/// RFC 6750 bearer challenge naming the single scope the tool requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    pub kind: DenyKind,
    pub scope: Scope,
}

impl Challenge {
    pub fn new(kind: DenyKind, scope: Scope) -> Self {
        Self { kind, scope }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            DenyKind::InvalidToken => StatusCode::UNAUTHORIZED,
            DenyKind::InsufficientScope => StatusCode::FORBIDDEN,
        }
    }

    pub fn description(&self) -> String {
        match self.kind {
            DenyKind::InvalidToken => "Authentication required".to_string(),
            DenyKind::InsufficientScope => format!("Required scope: {}", self.scope),
        }
    }

    pub fn header_value(&self) -> String {
        format!(
            r#"Bearer error="{}", error_description="{}", scope="{}""#,
            self.kind.as_str(),
            self.description(),
            self.scope
        )
    }
}

impl IntoResponse for Challenge {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.kind.as_str(),
            "error_description": self.description(),
        });
        let mut response = (self.status(), Json(body)).into_response();

        // Built only from fixed ASCII and scope names.
        if let Ok(value) = HeaderValue::from_str(&self.header_value()) {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_invalid_token_header() {
        let challenge = Challenge::new(DenyKind::InvalidToken, Scope::Read);
        assert_eq!(challenge.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            challenge.header_value(),
            r#"Bearer error="invalid_token", error_description="Authentication required", scope="read""#
        );
    }

    #[test]
    fn test_insufficient_scope_header() {
        let challenge = Challenge::new(DenyKind::InsufficientScope, Scope::Write);
        assert_eq!(challenge.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            challenge.header_value(),
            r#"Bearer error="insufficient_scope", error_description="Required scope: write", scope="write""#
        );
    }

    #[tokio::test]
    async fn test_response_carries_header_and_body() -> anyhow::Result<()> {
        let response = Challenge::new(DenyKind::InsufficientScope, Scope::Write).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE].to_str()?,
            r#"Bearer error="insufficient_scope", error_description="Required scope: write", scope="write""#
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(
            json,
            json!({"error": "insufficient_scope", "error_description": "Required scope: write"})
        );
        Ok(())
    }
}

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

//! Proof Key for Code Exchange (RFC 7636).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::oauth_error::OAuthError;

const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Only the S256 transform is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkceMethod {
    S256,
}

impl PkceMethod {
    pub fn parse(raw: Option<&str>) -> Result<Self, OAuthError> {
        match raw.unwrap_or("S256") {
            "S256" => Ok(PkceMethod::S256),
            _ => Err(OAuthError::invalid_request(
                "Only S256 code_challenge_method is supported",
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PkceMethod::S256 => "S256",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceChallenge {
    pub method: PkceMethod,
    pub value: String,
}

impl PkceChallenge {
    /// Build a challenge from authorization request parameters.
    pub fn from_request(
        code_challenge: Option<&str>,
        code_challenge_method: Option<&str>,
    ) -> Result<Self, OAuthError> {
        let method = PkceMethod::parse(code_challenge_method)?;
        let value = code_challenge
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| OAuthError::invalid_request("code_challenge is required"))?;

        Ok(Self {
            method,
            value: value.to_string(),
        })
    }

    pub fn from_verifier(verifier: &str) -> Self {
        Self {
            method: PkceMethod::S256,
            value: s256_challenge(verifier),
        }
    }

    pub fn verify(&self, code_verifier: &str) -> bool {
        verify_pkce(code_verifier, &self.value, self.method.as_str())
    }
}

pub fn s256_challenge(code_verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Verify PKCE code challenge
pub fn verify_pkce(code_verifier: &str, code_challenge: &str, method: &str) -> bool {
    if method != "S256" || !is_well_formed_verifier(code_verifier) {
        return false;
    }

    s256_challenge(code_verifier) == code_challenge
}

/// 43 to 128 characters from the unreserved set.
pub fn is_well_formed_verifier(code_verifier: &str) -> bool {
    (43..=128).contains(&code_verifier.len())
        && code_verifier.bytes().all(|b| VERIFIER_CHARSET.contains(&b))
}

pub fn generate_code_verifier() -> String {
    let mut rng = rand::thread_rng();
    (0..64)
        .map(|_| VERIFIER_CHARSET[rng.gen_range(0..VERIFIER_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_pkce_verification() {
        assert!(verify_pkce(RFC_VERIFIER, RFC_CHALLENGE, "S256"));
        assert!(!verify_pkce(RFC_VERIFIER, "wrong_challenge", "S256"));
        assert!(!verify_pkce(RFC_VERIFIER, RFC_CHALLENGE, "plain"));
    }

    #[test]
    fn test_malformed_verifier_never_matches() {
        let short = "abc";
        assert!(!verify_pkce(short, &s256_challenge(short), "S256"));

        let bad_chars = "a".repeat(42) + "!";
        assert!(!verify_pkce(&bad_chars, &s256_challenge(&bad_chars), "S256"));
    }

    #[test]
    fn test_challenge_from_request() {
        let challenge = PkceChallenge::from_request(Some(RFC_CHALLENGE), None).unwrap();
        assert_eq!(challenge.method, PkceMethod::S256);
        assert!(challenge.verify(RFC_VERIFIER));

        let err = PkceChallenge::from_request(Some(RFC_CHALLENGE), Some("plain")).unwrap_err();
        assert_eq!(err.error, "invalid_request");

        let err = PkceChallenge::from_request(None, Some("S256")).unwrap_err();
        assert_eq!(err.error, "invalid_request");
    }

    #[test]
    fn test_generated_verifier_round_trip() {
        let verifier = generate_code_verifier();
        assert!(is_well_formed_verifier(&verifier));
        assert!(PkceChallenge::from_verifier(&verifier).verify(&verifier));
        assert_ne!(verifier, generate_code_verifier());
    }
}

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

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for code and token lifetimes (one year).
const MAX_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Public base URL. Derived from host and port when unset.
    #[serde(default)]
    pub issuer: Option<String>,

    #[serde(default = "default_demo_username")]
    pub demo_username: String,

    #[serde(default = "default_demo_password")]
    pub demo_password: String,

    #[serde(default = "default_code_lifetime_secs")]
    pub code_lifetime_secs: u64,

    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            issuer: None,
            demo_username: default_demo_username(),
            demo_password: default_demo_password(),
            code_lifetime_secs: default_code_lifetime_secs(),
            token_lifetime_secs: default_token_lifetime_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config: Config = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the timers or lifetimes meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_secs == 0 {
            bail!("sweep_interval_secs must be greater than zero");
        }
        for (name, secs) in [
            ("code_lifetime_secs", self.code_lifetime_secs),
            ("token_lifetime_secs", self.token_lifetime_secs),
        ] {
            if secs == 0 || secs > MAX_LIFETIME_SECS {
                bail!("{} must be between 1 and {}, got {}", name, MAX_LIFETIME_SECS, secs);
            }
        }
        Ok(())
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("inkgate-auth.toml"))
            .merge(Env::prefixed("INKGATE_AUTH_"))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn issuer_url(&self) -> String {
        match &self.issuer {
            Some(issuer) => issuer.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }

    pub fn code_lifetime(&self) -> chrono::Duration {
        lifetime(self.code_lifetime_secs)
    }

    pub fn token_lifetime(&self) -> chrono::Duration {
        lifetime(self.token_lifetime_secs)
    }

    /// Never zero: a zero period would stop the sweeper.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

fn lifetime(secs: u64) -> chrono::Duration {
    let capped = i64::try_from(secs.min(MAX_LIFETIME_SECS)).unwrap_or(i64::MAX);
    chrono::Duration::seconds(capped)
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_demo_username() -> String {
    "demo_user".to_string()
}

fn default_demo_password() -> String {
    "demo_password".to_string()
}

fn default_code_lifetime_secs() -> u64 {
    300
}

fn default_token_lifetime_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.issuer_url(), "http://localhost:9000");
        assert_eq!(config.demo_username, "demo_user");
        assert_eq!(config.code_lifetime(), chrono::Duration::minutes(5));
        assert_eq!(config.token_lifetime(), chrono::Duration::hours(1));
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_issuer_trailing_slash_is_trimmed() {
        let config = Config {
            issuer: Some("https://auth.example.com/".to_string()),
            ..Config::default()
        };
        assert_eq!(config.issuer_url(), "https://auth.example.com");
    }

    #[test]
    fn test_env_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("INKGATE_AUTH_PORT", "9100");
            jail.set_env("INKGATE_AUTH_DEMO_PASSWORD", "hunter2");

            let config: Config = Config::figment().extract()?;
            assert_eq!(config.port, 9100);
            assert_eq!(config.demo_password, "hunter2");
            assert_eq!(config.demo_username, "demo_user");
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_is_read() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "inkgate-auth.toml",
                r#"
                    issuer = "https://auth.example.com"
                    token_lifetime_secs = 60
                "#,
            )?;

            let config: Config = Config::figment().extract()?;
            assert_eq!(config.issuer_url(), "https://auth.example.com");
            assert_eq!(config.token_lifetime_secs, 60);
            Ok(())
        });
    }

    #[test]
    fn test_zero_sweep_interval_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("INKGATE_AUTH_SWEEP_INTERVAL_SECS", "0");

            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("sweep_interval_secs"));
            Ok(())
        });
    }

    #[test]
    fn test_out_of_range_lifetime_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("INKGATE_AUTH_TOKEN_LIFETIME_SECS", "99999999999");

            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("token_lifetime_secs"));
            Ok(())
        });
    }

    #[test]
    fn test_accessors_never_panic_on_unvalidated_values() {
        let config = Config {
            code_lifetime_secs: u64::MAX,
            token_lifetime_secs: u64::MAX,
            sweep_interval_secs: 0,
            ..Config::default()
        };

        assert_eq!(config.code_lifetime(), chrono::Duration::days(365));
        assert_eq!(config.token_lifetime(), chrono::Duration::days(365));
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
        assert!(config.validate().is_err());
    }
}

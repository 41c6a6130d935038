use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::protocol::{EngineConfig, SecretEncoding};

/// Client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the verifier.
    pub server_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Caps on the round loop.
    pub engine: EngineConfig,
    /// How the password becomes the secret exponent.
    pub encoding: SecretEncoding,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 10,
            engine: EngineConfig::default(),
            encoding: SecretEncoding::CharCodes,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from `.env` file, TOML file, and environment variables.
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables with `CLIENT_` prefix, nested keys separated
    ///    by `__` (e.g., `CLIENT_ENGINE__MAX_ROUNDS=128`)
    /// 2. TOML configuration file (`CLIENT_CONFIG_PATH`, default
    ///    `./config/client.toml`, skipped if missing)
    /// 3. Built-in defaults
    ///
    /// # Environment Variable Examples
    /// ```bash
    /// CLIENT_SERVER_URL=https://verifier.example.org
    /// CLIENT_TIMEOUT_SECS=5
    /// CLIENT_ENCODING__KIND=argon2
    /// CLIENT_ENCODING__REALM=verifier.example.org
    /// ```
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> figment::error::Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("CLIENT_CONFIG_PATH")
            .unwrap_or_else(|_| "config/client.toml".to_string());

        Self::from_figment(
            Self::figment()
                .merge(Toml::file(&config_path))
                .merge(Env::prefixed("CLIENT_").split("__")),
        )
    }

    /// Defaults as the lowest-priority figment layer.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }

    /// Extracts a configuration from an arbitrary figment.
    #[allow(clippy::result_large_err)]
    pub fn from_figment(figment: Figment) -> figment::error::Result<Self> {
        figment.extract()
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error message describing the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(format!(
                "server_url must be an http(s) URL: {}",
                self.server_url
            ));
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs cannot be zero".to_string());
        }

        self.engine.validate().map_err(|e| e.to_string())?;

        if let SecretEncoding::Argon2 { realm } = &self.encoding {
            if realm.is_empty() {
                return Err("argon2 encoding requires a non-empty realm".to_string());
            }
        }

        Ok(())
    }

    /// Builds an HTTP transport for the configured verifier.
    #[cfg(feature = "client")]
    pub fn http_transport(&self) -> crate::Result<crate::transport::HttpTransport> {
        crate::transport::HttpTransport::new(&self.server_url, self.timeout())
    }
}

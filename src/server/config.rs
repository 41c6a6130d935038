use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use actix_web::http::Uri;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::RoundPolicy;
use crate::{Error, GroupParameters, Operand, Result};

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Hostname or IP address to bind to.
    pub host: String,
    /// Port number to listen on.
    pub port: u16,
    /// Group handed out at handshake.
    pub group: GroupSettings,
    /// When the round loop stops and what it takes to authenticate.
    pub policy: RoundPolicy,
    /// Session lifetime and capacity.
    pub session: SessionSettings,
    /// Rate limiting configuration.
    pub rate_limit: RateLimitSettings,
    /// Metrics exporter configuration.
    pub metrics: MetricsSettings,
    /// Cross-origin configuration.
    pub cors: CorsSettings,
}

impl ServerConfig {
    /// Converts host and port into a socket address.
    ///
    /// # Errors
    /// Returns an error message if host and port do not form a socket address.
    pub fn addr(&self) -> std::result::Result<SocketAddr, String> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                format!(
                    "Invalid server address configuration (host: {}, port: {}): {e}",
                    self.host, self.port
                )
            })
    }
}

/// Group parameters served to clients.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupSettings {
    /// RFC 5114 2048-bit MODP group with a 256-bit prime order subgroup.
    #[default]
    #[serde(rename = "rfc5114_2048_256")]
    Rfc5114Modp2048,
    /// Operator-supplied safe prime and generator, hex-encoded.
    Custom {
        /// Prime modulus.
        p: Operand,
        /// Generator.
        g: Operand,
    },
}

impl GroupSettings {
    /// Builds and validates the group.
    pub fn parameters(&self) -> Result<GroupParameters> {
        match self {
            Self::Rfc5114Modp2048 => Ok(GroupParameters::rfc5114_2048_256()),
            Self::Custom { p, g } => GroupParameters::new(p.clone(), g.clone()),
        }
    }
}

/// Session lifetime and capacity settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Seconds a session stays usable after its handshake.
    pub ttl_secs: u64,
    /// Live sessions kept at most; further handshakes are refused.
    pub max_sessions: usize,
    /// Seconds between expired-session sweeps.
    pub cleanup_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_sessions: 10_000,
            cleanup_interval_secs: 60,
        }
    }
}

/// Rate limiting settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Maximum sustained requests per minute.
    pub requests_per_minute: u64,
    /// Burst capacity for short-term spikes.
    pub burst: u64,
}

impl RateLimitSettings {
    /// Creates a rate limiter from these settings.
    pub fn build_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.requests_per_minute, self.burst)
    }
}

/// Rate limiter using token bucket algorithm.
///
/// Each peer address gets its own bucket, so one client draining its burst
/// does not lock out the others. Requests without a known peer share one
/// bucket. Each authentication costs a handful of requests per round, so
/// size `burst` for whole attempts.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<Option<IpAddr>, Bucket>>>,
    rate: u64,
    burst: u64,
}

struct Bucket {
    tokens: f64,
    last_update: Instant,
}

/// Peers tracked before idle buckets are swept.
const SWEEP_THRESHOLD: usize = 4096;

impl RateLimiter {
    /// Creates a new rate limiter.
    ///
    /// # Arguments
    /// * `requests_per_minute` - Maximum sustained request rate per peer
    /// * `burst` - Maximum burst capacity per peer
    pub fn new(requests_per_minute: u64, burst: u64) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            rate: requests_per_minute,
            burst,
        }
    }

    /// Attempts to acquire a token for a request from `peer`.
    ///
    /// Returns [`Error::RateLimited`] when the peer's bucket is empty.
    pub async fn check_rate_limit(&self, peer: Option<IpAddr>) -> Result<()> {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();

        if !buckets.contains_key(&peer) && buckets.len() >= SWEEP_THRESHOLD {
            self.sweep(&mut buckets, now);
        }

        let bucket = buckets.entry(peer).or_insert_with(|| Bucket {
            tokens: self.burst as f64,
            last_update: now,
        });

        bucket.tokens = self.refill(bucket, now);
        bucket.last_update = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            Err(Error::RateLimited)
        }
    }

    /// Number of peers currently holding a bucket.
    pub async fn tracked_peers(&self) -> usize {
        self.buckets.lock().await.len()
    }

    fn refill(&self, bucket: &Bucket, now: Instant) -> f64 {
        let elapsed = now.duration_since(bucket.last_update).as_secs_f64();
        let tokens_per_second = self.rate as f64 / 60.0;
        (bucket.tokens + elapsed * tokens_per_second).min(self.burst as f64)
    }

    // a full bucket is indistinguishable from a fresh one
    fn sweep(&self, buckets: &mut HashMap<Option<IpAddr>, Bucket>, now: Instant) {
        let burst = self.burst as f64;
        buckets.retain(|_, bucket| self.refill(bucket, now) < burst);
    }
}

/// Cross-origin settings for browser clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsSettings {
    /// Whether the CORS layer wraps the routes.
    pub enabled: bool,
    /// Origins allowed to call the verifier; empty allows any origin.
    pub allowed_origins: Vec<String>,
    /// Seconds a browser may cache a preflight response.
    pub max_age_secs: usize,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: vec!["http://localhost:3080".to_string()],
            max_age_secs: 3600,
        }
    }
}

impl CorsSettings {
    fn validate(&self) -> std::result::Result<(), String> {
        for origin in &self.allowed_origins {
            if origin == "*" {
                return Err(
                    "CORS origin \"*\" is not allowed; leave allowed_origins empty".to_string(),
                );
            }
            origin
                .parse::<Uri>()
                .map_err(|e| format!("Invalid CORS origin {origin:?}: {e}"))?;
        }
        Ok(())
    }
}

/// Metrics exporter settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Whether the Prometheus exporter is started.
    pub enabled: bool,
    /// Hostname or IP address for metrics server.
    pub host: String,
    /// Port number for metrics server.
    pub port: u16,
}

impl MetricsSettings {
    /// Converts host and port into a socket address for metrics server.
    ///
    /// # Errors
    /// Returns an error message if host and port do not form a socket address.
    pub fn addr(&self) -> std::result::Result<SocketAddr, String> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                format!(
                    "Invalid metrics address configuration (host: {}, port: {}): {e}",
                    self.host, self.port
                )
            })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            group: GroupSettings::default(),
            policy: RoundPolicy::default(),
            session: SessionSettings::default(),
            rate_limit: RateLimitSettings {
                requests_per_minute: 6000,
                burst: 500,
            },
            metrics: MetricsSettings {
                enabled: false,
                host: "127.0.0.1".to_string(),
                port: 9090,
            },
            cors: CorsSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from `.env` file, TOML file, and environment variables.
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables with `SERVER_` prefix, nested keys separated
    ///    by `__` (e.g., `SERVER_POLICY__REQUIRED_VALID_ROUNDS=20`)
    /// 2. TOML configuration file (if exists)
    /// 3. Built-in defaults
    ///
    /// The `.env` file is loaded from the current directory or any parent
    /// directory; a missing file is not an error.
    ///
    /// The TOML file path can be set via `SERVER_CONFIG_PATH` environment variable.
    /// If not set, defaults to `./config/server.toml`. If the file doesn't exist,
    /// it is silently skipped.
    ///
    /// # Environment Variable Examples
    /// ```bash
    /// SERVER_HOST=0.0.0.0
    /// SERVER_PORT=8080
    /// SERVER_RATE_LIMIT__BURST=1000
    /// SERVER_SESSION__TTL_SECS=120
    /// SERVER_METRICS__ENABLED=true
    /// ```
    ///
    /// Custom groups belong in the TOML file: environment values that look
    /// numeric are parsed as numbers and rejected as operands.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> figment::error::Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("SERVER_CONFIG_PATH")
            .unwrap_or_else(|_| "config/server.toml".to_string());

        Self::from_figment(
            Self::figment()
                .merge(Toml::file(&config_path))
                .merge(Env::prefixed("SERVER_").split("__")),
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

    /// Validates the configuration for production readiness.
    ///
    /// # Errors
    /// Returns an error message if the configuration is invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.addr()?;

        if self.metrics.enabled {
            self.metrics.addr()?;
        }

        self.group
            .parameters()
            .map_err(|e| format!("Invalid group configuration: {e}"))?;

        self.policy.validate()?;

        if self.session.ttl_secs == 0 {
            return Err("Session ttl_secs cannot be zero".to_string());
        }

        if self.session.max_sessions == 0 {
            return Err("Session max_sessions cannot be zero".to_string());
        }

        if self.session.cleanup_interval_secs == 0 {
            return Err("Session cleanup_interval_secs cannot be zero".to_string());
        }

        if self.rate_limit.requests_per_minute == 0 {
            return Err("Rate limit requests_per_minute cannot be zero".to_string());
        }

        if self.rate_limit.burst == 0 {
            return Err("Rate limit burst cannot be zero".to_string());
        }

        if self.cors.enabled {
            self.cors.validate()?;
        }

        Ok(())
    }
}

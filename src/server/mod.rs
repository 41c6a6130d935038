//! Verifier side: session state, round policy and the HTTP service.

/// Verifier-side session state.
pub mod state;

/// HTTP routes.
pub mod service;

/// Server configuration and rate limiting.
pub mod config;

/// In-process transport.
pub mod local;

/// Stopping rule and decision.
pub mod policy;

pub use config::{CorsSettings, GroupSettings, RateLimiter, ServerConfig};
pub use local::LocalTransport;
pub use policy::RoundPolicy;
pub use service::AppState;
pub use state::ServerState;

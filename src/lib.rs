//! Multi-round discrete-logarithm zero-knowledge password proof.
//!
//! A client proves knowledge of a password-derived exponent `x` to a verifier
//! holding only `y = g^x mod p`. Each round the client commits to a fresh
//! `c = g^r mod p`, the verifier picks one of two challenges, and the client
//! reveals either `r` or `x + r mod (p-1)`. An impostor answers one branch at
//! best, so `k` valid rounds bound forgery by `2^-k`.
//!
//! ```rust,no_run
//! use dl_zkpp::client::Authenticator;
//! use dl_zkpp::transport::HttpTransport;
//! use dl_zkpp::{EngineConfig, Secret, SecretEncoding};
//! use std::time::Duration;
//!
//! # async fn login() -> dl_zkpp::Result<()> {
//! let transport = HttpTransport::new("http://127.0.0.1:8080", Duration::from_secs(10))?;
//! let authenticator = Authenticator::new(transport, EngineConfig::default())?;
//!
//! let secret = Secret::from_password("correct horse", &SecretEncoding::CharCodes)?;
//! let result = authenticator.authenticate(secret).await?;
//! println!("authenticated: {}", result.authenticated);
//! # Ok(())
//! # }
//! ```

/// Single-flight authentication attempts and client configuration.
pub mod client;
/// Operand encoding, modular arithmetic, groups and primitive operations.
pub mod crypto;
/// Error types.
pub mod error;
/// JSON messages of the HTTP surface.
pub mod proto;
/// Secret encoding, session typestate, prover, verifier and round engine.
pub mod protocol;
/// Verifier state and HTTP service.
#[cfg(feature = "server")]
pub mod server;
/// Transport trait and HTTP client.
pub mod transport;

pub use crypto::{Challenge, CryptoProvider, GroupParameters, ModPowProvider, Operand};
pub use error::Error;
pub use protocol::{
    AttemptLedger, AuthenticationResult, ChallengeResponseEngine, EngineConfig, EngineState,
    RoundOutcome, Secret, SecretEncoding, SessionId,
};
pub use transport::Transport;

/// Result type for crate operations.
pub type Result<T> = core::result::Result<T, Error>;

//! Error types for the password proof.

/// Main error types for the library.
///
/// An invalid proof for a single round is not an error: it is reported as
/// [`RoundOutcome::valid`](crate::RoundOutcome) being `false` and counted in the
/// [`AttemptLedger`](crate::AttemptLedger).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The verifier did not hand out a session identifier.
    #[error("Handshake rejected: {0}")]
    HandshakeRejected(String),

    /// A request to the verifier failed at the network level or was answered
    /// with an error status.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// A numeric operand is malformed or outside the accepted range.
    #[error("Invalid operand: {0}")]
    InvalidOperand(String),

    /// Invalid group parameters were provided.
    #[error("Invalid group parameters: {0}")]
    InvalidParams(String),

    /// The password could not be turned into a secret.
    #[error("Secret derivation failed: {0}")]
    SecretDerivation(String),

    /// The verifier kept asking for rounds past the client-side cap.
    #[error("Round limit of {0} reached before the verifier concluded")]
    RoundLimitExceeded(u32),

    /// Too many rounds were rejected by the verifier.
    #[error("Invalid round limit of {0} reached")]
    InvalidLimitExceeded(u32),

    /// The attempt was cancelled before it reached a terminal state.
    #[error("Authentication attempt cancelled")]
    Cancelled,

    /// Another attempt is still running on the same authenticator.
    #[error("An authentication attempt is already in flight")]
    AttemptInFlight,

    /// A request lacked a required header.
    #[error("Missing {0} header")]
    MissingHeader(&'static str),

    /// The verifier has no live session under this identifier.
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// A request arrived out of protocol order.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The verifier refused the request because of its rate limit.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The verifier ran out of room for new sessions.
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),
}

#[cfg(feature = "client")]
impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Self::TransportFailure(value.to_string())
    }
}

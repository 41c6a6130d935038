/// Round loop driven by the verifier's `cont` signal.
pub mod engine;
/// Per-session round counters.
pub mod ledger;
/// Prover side of a round.
pub mod prover;
/// Password to secret exponent.
pub mod secret;
/// Handshake, enrollment and decision as a typestate.
pub mod session;
/// Verifier side of a round.
pub mod verifier;

pub use engine::{ChallengeResponseEngine, EngineConfig, EngineState, RoundOutcome};
pub use ledger::AttemptLedger;
pub use prover::{Commitment, Nonce, Proof, Prover};
pub use secret::{Secret, SecretEncoding};
pub use session::{AuthenticationResult, EnrolledSession, Session, SessionId};
pub use verifier::Verifier;

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{AttemptLedger, EnrolledSession};
use crate::transport::Transport;
use crate::{CryptoProvider, Error, Result};

/// Verifier's answer to one submitted proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundOutcome {
    /// Whether the proof satisfied the round's equation.
    pub valid: bool,
    /// Whether the verifier wants another round.
    pub cont: bool,
}

impl From<crate::proto::VerifyResponse> for RoundOutcome {
    fn from(response: crate::proto::VerifyResponse) -> Self {
        Self {
            valid: response.valid,
            cont: response.cont,
        }
    }
}

/// Client-side caps on a verifier-driven round loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Abort once this many rounds ran and the verifier still asks for more.
    pub max_rounds: u32,
    /// Abort once this many proofs were rejected and the verifier still asks for more.
    pub max_invalid: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_rounds: 256,
            max_invalid: 32,
        }
    }
}

impl EngineConfig {
    /// Checks that both caps are non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(Error::InvalidParams("max_rounds cannot be zero".to_string()));
        }
        if self.max_invalid == 0 {
            return Err(Error::InvalidParams("max_invalid cannot be zero".to_string()));
        }
        Ok(())
    }
}

/// Where the engine is in its round loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Commitment sent or about to be sent, waiting for the challenge.
    AwaitChallenge,
    /// Proof submitted, waiting for the round outcome.
    Verifying,
    /// The verifier asked for another round.
    Continue,
    /// The verifier ended the loop.
    Terminal,
    /// A fatal error, a cap or a cancellation ended the loop.
    Aborted,
}

/// Runs challenge rounds against the verifier until it stops asking.
///
/// Every round draws a fresh ephemeral exponent; a round is never retried.
/// Any error cancels the engine's token, so nothing else waiting on it issues
/// another request.
pub struct ChallengeResponseEngine<'a, T: ?Sized, P: ?Sized> {
    transport: &'a T,
    provider: &'a P,
    config: EngineConfig,
    cancel: CancellationToken,
    state: EngineState,
    ledger: AttemptLedger,
    ledger_tx: Arc<watch::Sender<AttemptLedger>>,
}

impl<'a, T, P> ChallengeResponseEngine<'a, T, P>
where
    T: Transport + ?Sized,
    P: CryptoProvider + ?Sized,
{
    /// Creates an engine with its own cancellation token and ledger channel.
    pub fn new(transport: &'a T, provider: &'a P, config: EngineConfig) -> Self {
        let (ledger_tx, _) = watch::channel(AttemptLedger::new());
        Self {
            transport,
            provider,
            config,
            cancel: CancellationToken::new(),
            state: EngineState::AwaitChallenge,
            ledger: AttemptLedger::new(),
            ledger_tx: Arc::new(ledger_tx),
        }
    }

    /// Uses `token` to abort the loop from outside.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Publishes ledger snapshots on an existing channel.
    pub fn with_ledger_publisher(mut self, ledger_tx: Arc<watch::Sender<AttemptLedger>>) -> Self {
        self.ledger_tx = ledger_tx;
        self
    }

    /// Subscribes to the ledger snapshot published after every round.
    pub fn subscribe(&self) -> watch::Receiver<AttemptLedger> {
        self.ledger_tx.subscribe()
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Counters of the current (or last) loop.
    pub fn ledger(&self) -> AttemptLedger {
        self.ledger
    }

    /// Token the engine races every request against.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Runs rounds until the verifier answers `cont = false`.
    ///
    /// # Errors
    ///
    /// Transport and operand errors, [`Error::Cancelled`],
    /// [`Error::RoundLimitExceeded`] and [`Error::InvalidLimitExceeded`]. Each
    /// leaves the engine [`EngineState::Aborted`] with its token cancelled.
    pub async fn run(&mut self, session: &EnrolledSession) -> Result<AttemptLedger> {
        match self.run_rounds(session).await {
            Ok(ledger) => {
                self.state = EngineState::Terminal;
                Ok(ledger)
            }
            Err(e) => {
                self.cancel.cancel();
                self.state = EngineState::Aborted;
                warn!(
                    session = %session.id(),
                    total_rounds = self.ledger.total_rounds(),
                    invalid_rounds = self.ledger.invalid_rounds(),
                    error = %e,
                    "round loop aborted"
                );
                Err(e)
            }
        }
    }

    async fn run_rounds(&mut self, session: &EnrolledSession) -> Result<AttemptLedger> {
        self.config.validate()?;
        self.ledger = AttemptLedger::new();
        self.ledger_tx.send_replace(self.ledger);

        let provider = self.provider;
        let transport = self.transport;
        let prover = session.prover(provider);

        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            self.state = EngineState::AwaitChallenge;
            let (commitment, nonce) = prover.commit()?;
            let challenge = until_cancelled(
                &self.cancel,
                transport.pick_choice(session.id(), commitment.value()),
            )
            .await?;

            let proof = prover.respond(nonce, challenge)?;

            self.state = EngineState::Verifying;
            let outcome =
                until_cancelled(&self.cancel, transport.verify(session.id(), proof.value()))
                    .await?;

            self.ledger.record(outcome.valid);
            self.ledger_tx.send_replace(self.ledger);

            debug!(
                session = %session.id(),
                round = self.ledger.total_rounds(),
                ?challenge,
                valid = outcome.valid,
                cont = outcome.cont,
                "round verified"
            );

            if !outcome.cont {
                return Ok(self.ledger);
            }

            self.state = EngineState::Continue;

            if self.ledger.total_rounds() >= self.config.max_rounds {
                return Err(Error::RoundLimitExceeded(self.config.max_rounds));
            }
            if self.ledger.invalid_rounds() >= self.config.max_invalid {
                return Err(Error::InvalidLimitExceeded(self.config.max_invalid));
            }
        }
    }
}

/// Resolves `fut` unless `token` is cancelled first.
///
/// A cancelled token wins even if `fut` is ready, and `fut` is dropped
/// without being polled again.
pub(crate) async fn until_cancelled<T, F>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_caps_are_rejected() {
        let config = EngineConfig {
            max_rounds: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidParams(_))));

        let config = EngineConfig {
            max_invalid: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidParams(_))));
    }

    #[tokio::test]
    async fn cancelled_token_wins_over_ready_future() {
        let token = CancellationToken::new();
        token.cancel();
        let result = until_cancelled(&token, async { Ok(7) }).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn live_token_passes_result_through() {
        let token = CancellationToken::new();
        let result = until_cancelled(&token, async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}

//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dl_zkpp::proto::HandshakeResponse;
use dl_zkpp::{
    AttemptLedger, Challenge, CryptoProvider, Error, GroupParameters, ModPowProvider, Operand,
    Result, RoundOutcome, SessionId, Transport,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Initialize test tracing (call once at the beginning of tests).
///
/// Subsequent calls are safe and will be ignored.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new("dl_zkpp=debug");

    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(filter)
        .try_init();
}

/// Safe prime 1019 = 2 * 509 + 1 with generator 2, for statistical tests.
pub fn group_1019() -> GroupParameters {
    GroupParameters::new(Operand::from(1019), Operand::from(2)).unwrap()
}

/// Toy group p = 23, g = 5.
pub fn group_23() -> GroupParameters {
    GroupParameters::new(Operand::from(23), Operand::from(5)).unwrap()
}

/// Calls observed by a [`ScriptedTransport`], in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Call {
    Handshake,
    PublicKey,
    PickChoice,
    Verify,
    Authenticated,
}

#[derive(Default)]
struct Recorded {
    calls: Vec<Call>,
    public_key: Option<Operand>,
    commitments: Vec<Operand>,
    challenges: Vec<Challenge>,
    pending: Option<(Operand, Challenge)>,
    round: u32,
    valid: Vec<bool>,
    snapshots: Vec<AttemptLedger>,
}

/// Stub verifier with a fixed script.
///
/// Checks every response for real against the enrolled `y`, and answers
/// `cont = true` for the first `continue_rounds - 1` rounds. A handshake
/// starts a new session: round numbering and validity restart, while the call
/// log, commitments and challenges accumulate.
pub struct ScriptedTransport {
    params: GroupParameters,
    client_id: Option<String>,
    choice: Option<Challenge>,
    continue_rounds: Option<u32>,
    invalid_rounds: HashSet<u32>,
    fail_pick_choice_at: Option<u32>,
    cancel_at: Option<(u32, CancellationToken)>,
    delay: Option<Duration>,
    provider: ModPowProvider,
    ledger: Mutex<Option<watch::Receiver<AttemptLedger>>>,
    recorded: Mutex<Recorded>,
}

impl ScriptedTransport {
    pub fn new(params: GroupParameters) -> Self {
        Self {
            params,
            client_id: Some("0123456789abcdef0123456789abcdef".to_string()),
            choice: None,
            continue_rounds: Some(5),
            invalid_rounds: HashSet::new(),
            fail_pick_choice_at: None,
            cancel_at: None,
            delay: None,
            provider: ModPowProvider::new(),
            ledger: Mutex::new(None),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    /// Always answer with `choice` instead of alternating.
    pub fn with_choice(mut self, choice: Challenge) -> Self {
        self.choice = Some(choice);
        self
    }

    /// Answer `cont = false` on round `rounds`.
    pub fn rounds(mut self, rounds: u32) -> Self {
        self.continue_rounds = Some(rounds);
        self
    }

    /// Never answer `cont = false`.
    pub fn endless(mut self) -> Self {
        self.continue_rounds = None;
        self
    }

    /// Report round `round` (1-based) as invalid whatever the proof.
    pub fn invalid_round(mut self, round: u32) -> Self {
        self.invalid_rounds.insert(round);
        self
    }

    /// Report every round as invalid.
    pub fn all_invalid(mut self) -> Self {
        self.invalid_rounds = (1..=10_000).collect();
        self
    }

    /// Fail the `pick-choice` call of round `round` at the network level.
    pub fn fail_pick_choice_at(mut self, round: u32) -> Self {
        self.fail_pick_choice_at = Some(round);
        self
    }

    /// Cancel `token` while serving the `pick-choice` call of round `round`.
    pub fn cancel_at(mut self, round: u32, token: CancellationToken) -> Self {
        self.cancel_at = Some((round, token));
        self
    }

    /// Omit `clientId` from the handshake.
    pub fn without_client_id(mut self) -> Self {
        self.client_id = None;
        self
    }

    /// Sleep before answering every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Snapshot `ledger` on every `pick-choice` call from now on.
    pub fn observe_ledger(&self, ledger: watch::Receiver<AttemptLedger>) {
        *self.ledger.lock().unwrap() = Some(ledger);
    }

    /// Ledgers seen at the start of each round, across sessions.
    pub fn snapshots(&self) -> Vec<AttemptLedger> {
        self.recorded.lock().unwrap().snapshots.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.recorded.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().into_iter().filter(|c| *c == call).count()
    }

    pub fn public_key(&self) -> Option<Operand> {
        self.recorded.lock().unwrap().public_key.clone()
    }

    pub fn commitments(&self) -> Vec<Operand> {
        self.recorded.lock().unwrap().commitments.clone()
    }

    pub fn challenges(&self) -> Vec<Challenge> {
        self.recorded.lock().unwrap().challenges.clone()
    }

    async fn enter(&self, call: Call) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.recorded.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn handshake(&self) -> Result<HandshakeResponse> {
        self.enter(Call::Handshake).await;
        {
            let mut recorded = self.recorded.lock().unwrap();
            recorded.public_key = None;
            recorded.pending = None;
            recorded.round = 0;
            recorded.valid.clear();
        }
        Ok(HandshakeResponse {
            client_id: self.client_id.clone(),
            p: self.params.p().clone(),
            g: self.params.g().clone(),
        })
    }

    async fn submit_public_key(&self, _session: &SessionId, y: &Operand) -> Result<()> {
        self.enter(Call::PublicKey).await;
        self.recorded.lock().unwrap().public_key = Some(y.clone());
        Ok(())
    }

    async fn pick_choice(&self, _session: &SessionId, c: &Operand) -> Result<Challenge> {
        self.enter(Call::PickChoice).await;
        let snapshot = self.ledger.lock().unwrap().as_ref().map(|rx| *rx.borrow());
        let mut recorded = self.recorded.lock().unwrap();
        recorded.snapshots.extend(snapshot);
        recorded.round += 1;
        let round = recorded.round;

        if self.fail_pick_choice_at == Some(round) {
            return Err(Error::TransportFailure("connection reset".to_string()));
        }
        if let Some((at, token)) = &self.cancel_at {
            if *at == round {
                token.cancel();
            }
        }

        let choice = self.choice.unwrap_or(if round % 2 == 1 {
            Challenge::Opening
        } else {
            Challenge::Linked
        });

        recorded.commitments.push(c.clone());
        recorded.challenges.push(choice);
        recorded.pending = Some((c.clone(), choice));
        Ok(choice)
    }

    async fn verify(&self, _session: &SessionId, res: &Operand) -> Result<RoundOutcome> {
        self.enter(Call::Verify).await;
        let mut recorded = self.recorded.lock().unwrap();

        let (c, challenge) = recorded
            .pending
            .take()
            .ok_or_else(|| Error::ProtocolViolation("no pending round".to_string()))?;
        let y = recorded
            .public_key
            .clone()
            .ok_or_else(|| Error::ProtocolViolation("no public key".to_string()))?;

        let round = recorded.valid.len() as u32 + 1;
        let checked = self
            .provider
            .check(challenge, res, &c, &y, self.params.g(), self.params.p())?;
        let valid = checked && !self.invalid_rounds.contains(&round);
        recorded.valid.push(valid);

        let cont = match self.continue_rounds {
            Some(rounds) => round < rounds,
            None => true,
        };

        Ok(RoundOutcome { valid, cont })
    }

    async fn authenticated(&self, _session: &SessionId) -> Result<bool> {
        self.enter(Call::Authenticated).await;
        let recorded = self.recorded.lock().unwrap();
        Ok(!recorded.valid.is_empty() && recorded.valid.iter().all(|v| *v))
    }
}

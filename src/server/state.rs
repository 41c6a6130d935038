use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use num_bigint::BigUint;
use rand_core::{OsRng, RngCore};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{RoundPolicy, ServerConfig};
use crate::proto::{HandshakeResponse, VerifyResponse};
use crate::protocol::{Commitment, Proof, Verifier};
use crate::{AttemptLedger, Challenge, Error, GroupParameters, ModPowProvider, Operand, Result};

/// Random bytes in a client id (hex-encoded on the wire).
const CLIENT_ID_BYTES: usize = 16;

const DEFAULT_SESSION_TTL_SECONDS: u64 = 300;
const DEFAULT_MAX_SESSIONS: usize = 10_000;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| unreachable!("System time is after UNIX_EPOCH"))
        .as_secs()
}

/// Commitment awaiting its response, with the challenge drawn for it.
#[derive(Clone, Debug)]
pub struct PendingRound {
    /// Commitment `c` sent by the client.
    pub commitment: Operand,
    /// Challenge returned for `c`.
    pub challenge: Challenge,
}

/// Everything the verifier knows about one client.
#[derive(Clone, Debug)]
pub struct ClientSession {
    /// Group handed out at handshake.
    pub params: GroupParameters,
    /// Enrolled public commitment `y`.
    pub public_key: Option<Operand>,
    /// Round between `pick-choice` and `verify`.
    pub pending: Option<PendingRound>,
    /// Round counters.
    pub ledger: AttemptLedger,
    /// Set once the verifier answered `cont = false`.
    pub finished: bool,
    /// Unix timestamp of the handshake.
    pub created_at: u64,
    /// Unix timestamp after which the session is dropped.
    pub expires_at: u64,
}

impl ClientSession {
    fn new(params: GroupParameters, ttl_secs: u64) -> Self {
        let created_at = unix_now();
        Self {
            params,
            public_key: None,
            pending: None,
            ledger: AttemptLedger::new(),
            finished: false,
            created_at,
            expires_at: created_at.saturating_add(ttl_secs),
        }
    }

    /// Checks if the session has expired.
    pub fn is_expired(&self) -> bool {
        unix_now() >= self.expires_at
    }
}

/// Verifier state: live sessions keyed by client id.
///
/// Enforces protocol order per session. Cloning shares the underlying map.
#[derive(Clone)]
pub struct ServerState {
    sessions: Arc<RwLock<HashMap<String, ClientSession>>>,
    params: GroupParameters,
    policy: RoundPolicy,
    provider: ModPowProvider,
    session_ttl: u64,
    max_sessions: usize,
}

impl ServerState {
    /// Creates empty state serving `params` under `policy`.
    pub fn new(params: GroupParameters, policy: RoundPolicy) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            params,
            policy,
            provider: ModPowProvider::new(),
            session_ttl: DEFAULT_SESSION_TTL_SECONDS,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Creates state from a validated configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let params = config.group.parameters()?;
        Ok(Self::new(params, config.policy)
            .with_limits(config.session.ttl_secs, config.session.max_sessions))
    }

    /// Overrides session lifetime (seconds) and capacity.
    pub fn with_limits(mut self, session_ttl: u64, max_sessions: usize) -> Self {
        self.session_ttl = session_ttl;
        self.max_sessions = max_sessions;
        self
    }

    /// Group handed out at handshake.
    pub fn params(&self) -> &GroupParameters {
        &self.params
    }

    /// Active round policy.
    pub fn policy(&self) -> &RoundPolicy {
        &self.policy
    }

    /// Opens a session under a fresh 128-bit client id.
    ///
    /// # Errors
    /// Returns [`Error::CapacityExceeded`] when `max_sessions` are live.
    pub async fn handshake(&self) -> Result<HandshakeResponse> {
        let mut sessions = self.sessions.write().await;

        if sessions.len() >= self.max_sessions {
            sessions.retain(|_, session| !session.is_expired());
            if sessions.len() >= self.max_sessions {
                warn!(max_sessions = self.max_sessions, "session capacity exhausted");
                return Err(Error::CapacityExceeded(format!(
                    "{} sessions already live",
                    self.max_sessions
                )));
            }
        }

        let client_id = loop {
            let mut bytes = [0u8; CLIENT_ID_BYTES];
            OsRng.fill_bytes(&mut bytes);
            let id = hex::encode(bytes);
            if !sessions.contains_key(&id) {
                break id;
            }
        };

        sessions.insert(
            client_id.clone(),
            ClientSession::new(self.params.clone(), self.session_ttl),
        );
        info!(client_id = %client_id, "handshake");

        Ok(HandshakeResponse {
            client_id: Some(client_id),
            p: self.params.p().clone(),
            g: self.params.g().clone(),
        })
    }

    /// Enrolls the public commitment `y`.
    ///
    /// Accepted once per session, before any round.
    pub async fn submit_public_key(&self, client_id: &str, y: Operand) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = live_session(&mut sessions, client_id)?;

        if session.public_key.is_some() {
            return Err(Error::ProtocolViolation(
                "public key already submitted".to_string(),
            ));
        }

        ensure_group_element(&y, &session.params, "y")?;
        session.public_key = Some(y);
        debug!(client_id, "public key enrolled");

        Ok(())
    }

    /// Records commitment `c` and draws its challenge.
    ///
    /// At most one round is pending per session, so a challenge cannot be
    /// redrawn for the same commitment.
    pub async fn pick_choice(&self, client_id: &str, c: Operand) -> Result<Challenge> {
        let mut sessions = self.sessions.write().await;
        let session = live_session(&mut sessions, client_id)?;

        let y = session
            .public_key
            .clone()
            .ok_or_else(|| Error::ProtocolViolation("public key not submitted".to_string()))?;
        if session.finished {
            return Err(Error::ProtocolViolation(
                "round loop already finished".to_string(),
            ));
        }
        if session.pending.is_some() {
            return Err(Error::ProtocolViolation(
                "a round is already pending".to_string(),
            ));
        }

        ensure_group_element(&c, &session.params, "c")?;

        let challenge = Verifier::new(&self.provider, &session.params, &y).pick_challenge(&mut OsRng);
        session.pending = Some(PendingRound {
            commitment: c,
            challenge,
        });

        Ok(challenge)
    }

    /// Checks the response for the pending round and decides whether to go on.
    pub async fn verify(&self, client_id: &str, res: Operand) -> Result<VerifyResponse> {
        let mut sessions = self.sessions.write().await;
        let session = live_session(&mut sessions, client_id)?;

        let pending = session
            .pending
            .take()
            .ok_or_else(|| Error::ProtocolViolation("no pending round".to_string()))?;
        let y = session
            .public_key
            .clone()
            .ok_or_else(|| Error::ProtocolViolation("public key not submitted".to_string()))?;

        let valid = Verifier::new(&self.provider, &session.params, &y).check(
            pending.challenge,
            &Commitment::new(pending.commitment),
            &Proof::new(res),
        )?;

        session.ledger.record(valid);
        let cont = self.policy.should_continue(&session.ledger);
        if !cont {
            session.finished = true;
        }

        debug!(
            client_id,
            round = session.ledger.total_rounds(),
            challenge = ?pending.challenge,
            valid,
            cont,
            "round verified"
        );

        Ok(VerifyResponse { cont, valid })
    }

    /// Returns the decision of a finished loop and ends the session.
    pub async fn authenticated(&self, client_id: &str) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        let session = live_session(&mut sessions, client_id)?;

        if !session.finished {
            return Err(Error::ProtocolViolation(
                "round loop not finished".to_string(),
            ));
        }

        let ledger = session.ledger;
        sessions.remove(client_id);

        let auth = self.policy.decide(&ledger);
        info!(
            client_id,
            auth,
            total_rounds = ledger.total_rounds(),
            invalid_rounds = ledger.invalid_rounds(),
            "decision"
        );

        Ok(auth)
    }

    /// Snapshot of one session.
    pub async fn session(&self, client_id: &str) -> Option<ClientSession> {
        let sessions = self.sessions.read().await;
        sessions.get(client_id).cloned()
    }

    /// Number of sessions held, expired ones included until the next sweep.
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    /// Removes expired sessions and returns how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        before - sessions.len()
    }
}

fn live_session<'m>(
    sessions: &'m mut HashMap<String, ClientSession>,
    client_id: &str,
) -> Result<&'m mut ClientSession> {
    let expired = match sessions.get(client_id) {
        Some(session) => session.is_expired(),
        None => return Err(Error::UnknownSession(client_id.to_string())),
    };

    if expired {
        sessions.remove(client_id);
        return Err(Error::UnknownSession(client_id.to_string()));
    }

    sessions
        .get_mut(client_id)
        .ok_or_else(|| Error::UnknownSession(client_id.to_string()))
}

/// `value` must lie in `[1, p)`.
fn ensure_group_element(value: &Operand, params: &GroupParameters, name: &str) -> Result<()> {
    let v = value.to_biguint()?;
    let p = params.p().to_biguint()?;

    if v == BigUint::from(0u32) || v >= p {
        return Err(Error::InvalidOperand(format!("{name} is not in [1, p)")));
    }

    Ok(())
}

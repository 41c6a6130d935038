use core::fmt;

use tracing::{debug, info};

use super::{AttemptLedger, Prover, Secret};
use crate::transport::Transport;
use crate::{CryptoProvider, Error, GroupParameters, Operand, Result};

/// Longest session identifier accepted from a verifier.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Verifier-assigned identifier correlating every call of one attempt.
///
/// Restricted to visible ASCII so it can always travel in a header.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Validates an identifier returned by a handshake.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandshakeRejected`] for an empty, oversized or
    /// non-printable identifier.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(Error::HandshakeRejected(
                "verifier returned an empty client id".to_string(),
            ));
        }

        if id.len() > MAX_SESSION_ID_LEN {
            return Err(Error::HandshakeRejected(format!(
                "client id longer than {MAX_SESSION_ID_LEN} characters"
            )));
        }

        if !id.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(Error::HandshakeRejected(
                "client id contains non-printable characters".to_string(),
            ));
        }

        Ok(Self(id))
    }

    /// Returns the identifier as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A session after a successful handshake, before enrollment.
///
/// Owns the secret for the rest of the attempt; the secret is zeroized when
/// the session (or the enrolled session it becomes) is dropped.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    params: GroupParameters,
    secret: Secret,
}

impl Session {
    /// Performs the handshake and validates the returned group.
    ///
    /// # Errors
    ///
    /// - [`Error::HandshakeRejected`] when no usable client id is returned
    /// - [`Error::InvalidParams`] when the verifier's group is unusable
    /// - any transport error
    pub async fn establish<T>(transport: &T, secret: Secret) -> Result<Self>
    where
        T: Transport + ?Sized,
    {
        let response = transport.handshake().await?;

        let id = match response.client_id {
            Some(id) => SessionId::new(id)?,
            None => {
                return Err(Error::HandshakeRejected(
                    "verifier returned no client id".to_string(),
                ));
            }
        };
        let params = GroupParameters::new(response.p, response.g)?;

        info!(session = %id, "session established");

        Ok(Self { id, params, secret })
    }

    /// Session identifier.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Group fixed by the handshake.
    pub fn params(&self) -> &GroupParameters {
        &self.params
    }

    /// Computes `y = g^x mod p` and registers it with the verifier.
    ///
    /// Only the returned [`EnrolledSession`] can run challenge rounds.
    pub async fn enroll<T, P>(self, transport: &T, provider: &P) -> Result<EnrolledSession>
    where
        T: Transport + ?Sized,
        P: CryptoProvider + ?Sized,
    {
        let public_key = Prover::new(provider, &self.params, &self.secret).public_commitment()?;

        transport.submit_public_key(&self.id, &public_key).await?;
        debug!(session = %self.id, "public key enrolled");

        Ok(EnrolledSession {
            session: self,
            public_key,
        })
    }
}

/// A session whose public commitment the verifier holds.
#[derive(Debug)]
pub struct EnrolledSession {
    session: Session,
    public_key: Operand,
}

impl EnrolledSession {
    /// Session identifier.
    pub fn id(&self) -> &SessionId {
        &self.session.id
    }

    /// Group fixed by the handshake.
    pub fn params(&self) -> &GroupParameters {
        &self.session.params
    }

    /// The enrolled `y`.
    pub fn public_key(&self) -> &Operand {
        &self.public_key
    }

    /// Creates a prover over this session's group and secret.
    pub fn prover<'a, P>(&'a self, provider: &'a P) -> Prover<'a, P>
    where
        P: CryptoProvider + ?Sized,
    {
        Prover::new(provider, &self.session.params, &self.session.secret)
    }

    /// Queries the final decision and ends the session.
    ///
    /// Must only be called once the round loop reached its terminal state.
    pub async fn conclude<T>(self, transport: &T, ledger: AttemptLedger) -> Result<AuthenticationResult>
    where
        T: Transport + ?Sized,
    {
        let authenticated = transport.authenticated(self.id()).await?;

        info!(
            session = %self.id(),
            authenticated,
            total_rounds = ledger.total_rounds(),
            invalid_rounds = ledger.invalid_rounds(),
            "authentication concluded"
        );

        Ok(AuthenticationResult {
            session_id: self.session.id.clone(),
            authenticated,
            ledger,
        })
    }
}

/// Terminal result of one attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticationResult {
    /// Session the decision belongs to.
    pub session_id: SessionId,
    /// The verifier's decision.
    pub authenticated: bool,
    /// Round counters at the time of the decision.
    pub ledger: AttemptLedger,
}

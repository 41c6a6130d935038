use async_trait::async_trait;

use super::ServerState;
use crate::proto::HandshakeResponse;
use crate::protocol::{RoundOutcome, SessionId};
use crate::transport::Transport;
use crate::{Challenge, Operand, Result};

/// [`Transport`] calling a [`ServerState`] in the same process.
///
/// Runs the verifier's ordering and policy checks without HTTP in between.
#[derive(Clone)]
pub struct LocalTransport {
    state: ServerState,
}

impl LocalTransport {
    /// Binds a transport to `state`.
    pub fn new(state: ServerState) -> Self {
        Self { state }
    }

    /// The bound verifier state.
    pub fn state(&self) -> &ServerState {
        &self.state
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn handshake(&self) -> Result<HandshakeResponse> {
        self.state.handshake().await
    }

    async fn submit_public_key(&self, session: &SessionId, y: &Operand) -> Result<()> {
        self.state.submit_public_key(session.as_str(), y.clone()).await
    }

    async fn pick_choice(&self, session: &SessionId, c: &Operand) -> Result<Challenge> {
        self.state.pick_choice(session.as_str(), c.clone()).await
    }

    async fn verify(&self, session: &SessionId, res: &Operand) -> Result<RoundOutcome> {
        let response = self.state.verify(session.as_str(), res.clone()).await?;
        Ok(response.into())
    }

    async fn authenticated(&self, session: &SessionId) -> Result<bool> {
        self.state.authenticated(session.as_str()).await
    }
}

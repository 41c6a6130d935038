//! Client side of the verifier's HTTP/JSON surface.
//!
//! The protocol core only sees the [`Transport`] trait. [`HttpTransport`]
//! speaks to a remote verifier; the `server` feature adds an in-process
//! transport bound directly to verifier state.

use std::sync::Arc;

use async_trait::async_trait;

use crate::proto::HandshakeResponse;
use crate::protocol::{RoundOutcome, SessionId};
use crate::{Challenge, Operand, Result};

#[cfg(feature = "client")]
mod http;

#[cfg(feature = "client")]
pub use http::HttpTransport;

/// One method per verifier call. Implementations never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a session and returns the verifier's group.
    async fn handshake(&self) -> Result<HandshakeResponse>;

    /// Registers the public commitment `y`.
    async fn submit_public_key(&self, session: &SessionId, y: &Operand) -> Result<()>;

    /// Sends the round commitment `c` and receives the challenge.
    async fn pick_choice(&self, session: &SessionId, c: &Operand) -> Result<Challenge>;

    /// Submits the round response and receives the outcome.
    async fn verify(&self, session: &SessionId, res: &Operand) -> Result<RoundOutcome>;

    /// Asks for the final decision once the loop ended.
    async fn authenticated(&self, session: &SessionId) -> Result<bool>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn handshake(&self) -> Result<HandshakeResponse> {
        (**self).handshake().await
    }

    async fn submit_public_key(&self, session: &SessionId, y: &Operand) -> Result<()> {
        (**self).submit_public_key(session, y).await
    }

    async fn pick_choice(&self, session: &SessionId, c: &Operand) -> Result<Challenge> {
        (**self).pick_choice(session, c).await
    }

    async fn verify(&self, session: &SessionId, res: &Operand) -> Result<RoundOutcome> {
        (**self).verify(session, res).await
    }

    async fn authenticated(&self, session: &SessionId) -> Result<bool> {
        (**self).authenticated(session).await
    }
}

//! Single-flight authentication attempts.

/// Client configuration loading.
pub mod config;

pub use config::ClientConfig;

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::protocol::engine::until_cancelled;
use crate::protocol::{
    AttemptLedger, AuthenticationResult, ChallengeResponseEngine, EngineConfig, Secret, Session,
};
use crate::transport::Transport;
use crate::{CryptoProvider, Error, ModPowProvider, Result};

/// Drives complete attempts: handshake, enrollment, round loop, decision.
///
/// At most one attempt runs per authenticator. A second call while one is in
/// flight fails with [`Error::AttemptInFlight`] instead of sharing state; the
/// slot frees only when the running attempt reached a terminal state.
pub struct Authenticator<T, P = ModPowProvider> {
    transport: T,
    provider: P,
    config: EngineConfig,
    in_flight: Mutex<()>,
    ledger_tx: Arc<watch::Sender<AttemptLedger>>,
}

impl<T: Transport> Authenticator<T> {
    /// Creates an authenticator using [`ModPowProvider`].
    pub fn new(transport: T, config: EngineConfig) -> Result<Self> {
        Self::with_provider(transport, ModPowProvider::new(), config)
    }
}

impl<T, P> Authenticator<T, P>
where
    T: Transport,
    P: CryptoProvider,
{
    /// Creates an authenticator with a custom primitive provider.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] when a cap in `config` is zero.
    pub fn with_provider(transport: T, provider: P, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let (ledger_tx, _) = watch::channel(AttemptLedger::new());

        Ok(Self {
            transport,
            provider,
            config,
            in_flight: Mutex::new(()),
            ledger_tx: Arc::new(ledger_tx),
        })
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Ledger snapshots of the current attempt, reset when a session is created.
    pub fn ledger(&self) -> watch::Receiver<AttemptLedger> {
        self.ledger_tx.subscribe()
    }

    /// Runs one attempt to completion.
    pub async fn authenticate(&self, secret: Secret) -> Result<AuthenticationResult> {
        self.authenticate_with_cancel(secret, &CancellationToken::new())
            .await
    }

    /// Runs one attempt that aborts as soon as `cancel` fires.
    ///
    /// The attempt works on a child of `cancel`; an error inside the attempt
    /// cancels only that child.
    pub async fn authenticate_with_cancel(
        &self,
        secret: Secret,
        cancel: &CancellationToken,
    ) -> Result<AuthenticationResult> {
        let _slot = self.in_flight.try_lock().map_err(|_| Error::AttemptInFlight)?;

        let token = cancel.child_token();
        let result = self.attempt(secret, &token).await;

        if let Err(e) = &result {
            token.cancel();
            warn!(error = %e, "authentication attempt aborted");
        }

        result
    }

    async fn attempt(&self, secret: Secret, token: &CancellationToken) -> Result<AuthenticationResult> {
        let session = until_cancelled(token, Session::establish(&self.transport, secret)).await?;
        self.ledger_tx.send_replace(AttemptLedger::new());

        let enrolled =
            until_cancelled(token, session.enroll(&self.transport, &self.provider)).await?;

        let mut engine = ChallengeResponseEngine::new(&self.transport, &self.provider, self.config)
            .with_cancellation(token.clone())
            .with_ledger_publisher(Arc::clone(&self.ledger_tx));
        let ledger = engine.run(&enrolled).await?;

        let result = until_cancelled(token, enrolled.conclude(&self.transport, ledger)).await?;

        info!(
            session = %result.session_id,
            authenticated = result.authenticated,
            "authentication attempt finished"
        );

        Ok(result)
    }
}

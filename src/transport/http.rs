use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::Transport;
use crate::proto::{
    AuthenticatedResponse, CLIENT_ID_HEADER, ErrorResponse, HandshakeResponse, PickChoiceRequest,
    PickChoiceResponse, PublicKeyRequest, VerifyRequest, VerifyResponse,
};
use crate::protocol::{RoundOutcome, SessionId};
use crate::{Challenge, Error, Operand, Result};

/// [`Transport`] over HTTP/JSON using `reqwest`.
///
/// Network errors and non-2xx statuses become [`Error::TransportFailure`],
/// carrying the verifier's `{err}` message when it sent one.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport for the verifier at `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuses an existing `reqwest` client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.err,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        };

        Err(Error::TransportFailure(format!(
            "verifier answered {}: {message}",
            status.as_u16()
        )))
    }

    async fn decode<R: DeserializeOwned>(response: Response) -> Result<R> {
        let response = Self::check_status(response).await?;
        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn handshake(&self) -> Result<HandshakeResponse> {
        debug!(url = %self.base_url, "handshake");
        let response = self.client.post(self.url("/handshake")).send().await?;
        Self::decode(response).await
    }

    async fn submit_public_key(&self, session: &SessionId, y: &Operand) -> Result<()> {
        let response = self
            .client
            .post(self.url("/public-key"))
            .header(CLIENT_ID_HEADER, session.as_str())
            .json(&PublicKeyRequest { y: y.clone() })
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn pick_choice(&self, session: &SessionId, c: &Operand) -> Result<Challenge> {
        let response = self
            .client
            .post(self.url("/pick-choice"))
            .header(CLIENT_ID_HEADER, session.as_str())
            .json(&PickChoiceRequest { c: c.clone() })
            .send()
            .await?;
        let body: PickChoiceResponse = Self::decode(response).await?;
        Ok(body.choice)
    }

    async fn verify(&self, session: &SessionId, res: &Operand) -> Result<RoundOutcome> {
        let response = self
            .client
            .post(self.url("/verify"))
            .header(CLIENT_ID_HEADER, session.as_str())
            .json(&VerifyRequest { res: res.clone() })
            .send()
            .await?;
        let body: VerifyResponse = Self::decode(response).await?;
        Ok(body.into())
    }

    async fn authenticated(&self, session: &SessionId) -> Result<bool> {
        let response = self
            .client
            .get(self.url("/authenticated"))
            .header(CLIENT_ID_HEADER, session.as_str())
            .send()
            .await?;
        let body: AuthenticatedResponse = Self::decode(response).await?;
        Ok(body.auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let transport = HttpTransport::new("http://127.0.0.1:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.base_url(), "http://127.0.0.1:8080");
        assert_eq!(transport.url("/verify"), "http://127.0.0.1:8080/verify");
    }

    #[tokio::test]
    async fn unreachable_verifier_is_a_transport_failure() {
        let transport = HttpTransport::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        assert!(matches!(
            transport.handshake().await,
            Err(Error::TransportFailure(_))
        ));
    }
}

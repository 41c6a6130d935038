//! JSON messages of the HTTP surface, shared by the client transport and the
//! verifier service.

use serde::{Deserialize, Serialize};

use crate::{Challenge, Operand};

/// Header carrying the session identifier on every call but the handshake.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// `POST /handshake` response.
///
/// `client_id` is optional on the client side so that a verifier omitting it
/// is reported as a rejected handshake rather than a decoding failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    #[serde(rename = "clientId", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub p: Operand,
    pub g: Operand,
}

/// `POST /public-key` request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRequest {
    pub y: Operand,
}

/// `POST /pick-choice` request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickChoiceRequest {
    pub c: Operand,
}

/// `POST /pick-choice` response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickChoiceResponse {
    pub choice: Challenge,
}

/// `POST /verify` request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub res: Operand,
}

/// `POST /verify` response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub cont: bool,
    pub valid: bool,
}

/// `GET /authenticated` response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedResponse {
    pub auth: bool,
}

/// `GET /healthcheck` response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Body of every error status returned by the verifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub err: String,
}

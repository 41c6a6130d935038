#![no_main]

use dl_zkpp::proto::{
    HandshakeResponse, PickChoiceRequest, PickChoiceResponse, PublicKeyRequest, VerifyRequest,
    VerifyResponse,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<HandshakeResponse>(data);
    let _ = serde_json::from_slice::<PublicKeyRequest>(data);
    let _ = serde_json::from_slice::<PickChoiceRequest>(data);
    let _ = serde_json::from_slice::<PickChoiceResponse>(data);
    let _ = serde_json::from_slice::<VerifyRequest>(data);
    let _ = serde_json::from_slice::<VerifyResponse>(data);
});

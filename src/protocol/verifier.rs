use rand_core::CryptoRngCore;

use super::{Commitment, Proof};
use crate::{Challenge, CryptoProvider, GroupParameters, Operand, Result};

/// Verifier side of one round of the password proof.
///
/// Checks responses against an enrolled public commitment `y` without ever
/// learning `x` or `r`.
pub struct Verifier<'a, P: CryptoProvider + ?Sized> {
    provider: &'a P,
    params: &'a GroupParameters,
    public_key: &'a Operand,
}

impl<'a, P: CryptoProvider + ?Sized> Verifier<'a, P> {
    /// Creates a verifier for the given group and public commitment.
    pub fn new(provider: &'a P, params: &'a GroupParameters, public_key: &'a Operand) -> Self {
        Self {
            provider,
            params,
            public_key,
        }
    }

    /// Interactive protocol: picks the challenge (second message).
    ///
    /// Must only be called after the commitment for the round is fixed.
    pub fn pick_challenge<R: CryptoRngCore>(&self, rng: &mut R) -> Challenge {
        Challenge::random(rng)
    }

    /// Interactive protocol: verifies the response (fourth message).
    ///
    /// Checks `g^res = c` for [`Challenge::Opening`] and `g^res = c * y` for
    /// [`Challenge::Linked`]. A mismatch is `Ok(false)`; only malformed
    /// operands are errors.
    pub fn check(&self, challenge: Challenge, commitment: &Commitment, proof: &Proof) -> Result<bool> {
        self.provider.check(
            challenge,
            proof.value(),
            commitment.value(),
            self.public_key,
            self.params.g(),
            self.params.p(),
        )
    }
}

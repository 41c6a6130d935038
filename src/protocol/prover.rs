use core::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::Secret;
use crate::{Challenge, CryptoProvider, GroupParameters, Operand, Result};

/// Prover side of one round of the password proof.
///
/// Holds references to the session's group and secret; every call to
/// [`commit`](Prover::commit) starts a new round with a fresh ephemeral
/// exponent.
///
/// # Security
///
/// - The [`Nonce`] returned by `commit` is consumed by [`respond`](Prover::respond),
///   so an ephemeral exponent answers exactly one challenge
/// - Never send a commitment before the previous round's response was verified
pub struct Prover<'a, P: CryptoProvider + ?Sized> {
    provider: &'a P,
    params: &'a GroupParameters,
    secret: &'a Secret,
}

impl<'a, P: CryptoProvider + ?Sized> Prover<'a, P> {
    /// Creates a prover for the given group and secret.
    pub fn new(provider: &'a P, params: &'a GroupParameters, secret: &'a Secret) -> Self {
        Self {
            provider,
            params,
            secret,
        }
    }

    /// Computes the public commitment `y = g^x mod p`.
    pub fn public_commitment(&self) -> Result<Operand> {
        self.provider
            .public_key(self.secret.expose(), self.params.g(), self.params.p())
    }

    /// Interactive protocol: generates commitment (first message).
    ///
    /// Returns the commitment `c = g^r mod p` and the nonce `r` (must be kept secret).
    pub fn commit(&self) -> Result<(Commitment, Nonce)> {
        let r = self.provider.gen_r(self.params.p())?;
        let c = self.provider.calc_c(&r, self.params.g(), self.params.p())?;

        Ok((Commitment::new(c), Nonce::new(r)))
    }

    /// Interactive protocol: generates response (third message).
    pub fn respond(&self, nonce: Nonce, challenge: Challenge) -> Result<Proof> {
        let res = self.provider.calc_choice(
            challenge,
            self.secret.expose(),
            nonce.r(),
            self.params.p(),
        )?;

        Ok(Proof::new(res))
    }
}

/// Round commitment `c = g^r mod p`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
    c: Operand,
}

impl Commitment {
    /// Wraps a commitment value.
    pub fn new(c: Operand) -> Self {
        Self { c }
    }

    /// Returns the commitment value.
    pub fn value(&self) -> &Operand {
        &self.c
    }
}

/// Secret ephemeral exponent `r` of one round.
///
/// Automatically zeroized when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Nonce {
    r: Operand,
}

impl Nonce {
    fn new(r: Operand) -> Self {
        Self { r }
    }

    fn r(&self) -> &Operand {
        &self.r
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Nonce(<redacted>)")
    }
}

/// Response to a challenge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    res: Operand,
}

impl Proof {
    /// Wraps a response value.
    pub fn new(res: Operand) -> Self {
        Self { res }
    }

    /// Returns the response value.
    pub fn value(&self) -> &Operand {
        &self.res
    }
}

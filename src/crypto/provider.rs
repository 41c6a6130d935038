//! Primitive operations of the protocol behind a single trait.

use num_bigint::{BigUint, RandBigInt};
use num_traits::CheckedSub;
use rand::Rng;
use rand_core::{CryptoRngCore, OsRng};
use serde::{Deserialize, Serialize};

use super::field::{mod_add, mod_mul, mod_pow};
use super::Operand;
use crate::{Error, Result};

/// The verifier's per-round challenge.
///
/// Serialized as `"R"` and `"XRMP"` on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Challenge {
    /// Challenge 0: reveal `r`, the opening of the commitment.
    #[serde(rename = "R")]
    Opening,
    /// Challenge 1: reveal `x + r mod (p-1)`, linking the commitment to `y`.
    #[serde(rename = "XRMP")]
    Linked,
}

impl Challenge {
    /// Draws a uniformly random challenge.
    pub fn random<R: CryptoRngCore>(rng: &mut R) -> Self {
        if rng.gen::<bool>() {
            Challenge::Linked
        } else {
            Challenge::Opening
        }
    }
}

/// Arithmetic contract consumed by the protocol.
///
/// All operations are pure given their inputs (apart from the randomness of
/// [`gen_r`](CryptoProvider::gen_r)) and take and return [`Operand`]s, so the
/// protocol never depends on a particular big-integer representation.
pub trait CryptoProvider: Send + Sync {
    /// Draws a fresh ephemeral exponent uniformly from `[1, p-1)`.
    fn gen_r(&self, p: &Operand) -> Result<Operand>;

    /// Computes the commitment `c = g^r mod p`.
    fn calc_c(&self, r: &Operand, g: &Operand, p: &Operand) -> Result<Operand>;

    /// Computes the public commitment `y = g^x mod p`.
    fn public_key(&self, x: &Operand, g: &Operand, p: &Operand) -> Result<Operand>;

    /// Computes the response to `challenge`.
    fn calc_choice(&self, challenge: Challenge, x: &Operand, r: &Operand, p: &Operand)
        -> Result<Operand>;

    /// Checks a response against the commitment and the public commitment.
    fn check(
        &self,
        challenge: Challenge,
        res: &Operand,
        c: &Operand,
        y: &Operand,
        g: &Operand,
        p: &Operand,
    ) -> Result<bool>;
}

/// [`CryptoProvider`] backed by `num-bigint` and the operating system RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModPowProvider;

impl ModPowProvider {
    /// Creates the provider.
    pub fn new() -> Self {
        Self
    }

    /// Draws `r` from `[1, p-1)` using the given generator.
    pub fn gen_r_with<R: CryptoRngCore>(&self, rng: &mut R, p: &Operand) -> Result<Operand> {
        let p = p.to_biguint()?;
        let one = BigUint::from(1u32);

        if p <= BigUint::from(2u32) {
            return Err(Error::InvalidOperand(
                "modulus p must be greater than 2".to_string(),
            ));
        }

        let upper = &p - &one;
        let r = rng.gen_biguint_range(&one, &upper);
        Ok(Operand::from_biguint(&r))
    }
}

impl CryptoProvider for ModPowProvider {
    fn gen_r(&self, p: &Operand) -> Result<Operand> {
        self.gen_r_with(&mut OsRng, p)
    }

    fn calc_c(&self, r: &Operand, g: &Operand, p: &Operand) -> Result<Operand> {
        let c = mod_pow(&g.to_biguint()?, &r.to_biguint()?, &p.to_biguint()?)?;
        Ok(Operand::from_biguint(&c))
    }

    fn public_key(&self, x: &Operand, g: &Operand, p: &Operand) -> Result<Operand> {
        let y = mod_pow(&g.to_biguint()?, &x.to_biguint()?, &p.to_biguint()?)?;
        Ok(Operand::from_biguint(&y))
    }

    fn calc_choice(
        &self,
        challenge: Challenge,
        x: &Operand,
        r: &Operand,
        p: &Operand,
    ) -> Result<Operand> {
        match challenge {
            Challenge::Opening => Ok(r.clone()),
            Challenge::Linked => {
                let order = p
                    .to_biguint()?
                    .checked_sub(&BigUint::from(1u32))
                    .ok_or_else(|| Error::InvalidParams("modulus p must be non-zero".to_string()))?;
                let res = mod_add(&x.to_biguint()?, &r.to_biguint()?, &order)?;
                Ok(Operand::from_biguint(&res))
            }
        }
    }

    fn check(
        &self,
        challenge: Challenge,
        res: &Operand,
        c: &Operand,
        y: &Operand,
        g: &Operand,
        p: &Operand,
    ) -> Result<bool> {
        let p = p.to_biguint()?;
        let c = c.to_biguint()?;
        let rhs = mod_pow(&g.to_biguint()?, &res.to_biguint()?, &p)?;

        match challenge {
            Challenge::Opening => Ok(c % &p == rhs),
            Challenge::Linked => {
                let lhs = mod_mul(&c, &y.to_biguint()?, &p)?;
                Ok(lhs == rhs)
            }
        }
    }
}

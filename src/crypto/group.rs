use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::Operand;
use crate::{Error, Result};

/// RFC 5114 section 2.3 modulus (2048-bit MODP group, 256-bit subgroup).
const RFC5114_2048_256_P: &str = "87A8E61DB4B6663CFFBBD19C651959998CEEF608660DD0F25D2CEED4435E3B00E00DF8F1D61957D4FAF7DF4561B2AA3016C3D91134096FAA3BF4296D830E9A7C209E0C6497517ABD5A8A9D306BCF67ED91F9E6725B4758C022E0B1EF4275BF7B6C5BFC11D45F9088B941F54EB1E59BB8BC39A0BF12307F5C4FDB70C581B23F76B63ACAE1CAA6B7902D52526735488A0EF13C6D9A51BFA4AB3AD8347796524D8EF6A167B5A41825D967E144E5140564251CCACB83E6B486F6B3CA3F7971506026C0B857F689962856DED4010ABD0BE621C3A3960A54E710C375F26375D7014103A4B54330C198AF126116D2276E11715F693877FAD7EF09CADB094AE91E1A1597";

/// RFC 5114 section 2.3 generator.
const RFC5114_2048_256_G: &str = "3FB32C9B73134D0B2E77506660EDBD484CA7B18F21EF205407F4793A1A0BA12510DBC15077BE463FFF4FED4AAC0BB555BE3A6C1B0C6B47B1BC3773BF7E8C6F62901228F8C28CBB18A55AE31341000A650196F931C77A57F2DDF463E5E9EC144B777DE62AAAB8A8628AC376D282D6ED3864E67982428EBC831D14348F6F2F9193B5045AF2767164E1DFC967C1FB3F2E55A4BD1BFFE83B9C80D052B985D182EA0ADB2A3B7313D3FE14C8484B1E052588B9B7D2BBD2DF016199ECD06E1557CD0915B3353BBB64E0EC377FD028370DF92B52C7891428CDC67EB6184B523D1DB246C32F63078490F00EF8D647D148D47954515E2327CFEF98C582664B4C0F6CC41659";

/// Prime modulus `p` and generator `g` of the group every exponentiation of a
/// session happens in.
///
/// Chosen by the verifier at handshake time and fixed for the session.
///
/// # Security
///
/// `p` must be prime. That is a caller contract: it is not (and cannot cheaply
/// be) checked here. Use [`GroupParameters::rfc5114_2048_256`] unless a
/// specific group is required.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupParameters {
    p: Operand,
    g: Operand,
}

impl GroupParameters {
    /// Creates parameters from a modulus and a generator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] if `p` is even or not greater than 3,
    /// or if `g` is not in `(1, p-1)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dl_zkpp::{GroupParameters, Operand};
    ///
    /// let params = GroupParameters::new(Operand::from(1019), Operand::from(2)).unwrap();
    /// assert_eq!(params.p().as_str(), "3fb");
    /// ```
    pub fn new(p: Operand, g: Operand) -> Result<Self> {
        let p_value = p.to_biguint()?;
        let g_value = g.to_biguint()?;

        if p_value <= BigUint::from(3u32) {
            return Err(Error::InvalidParams("modulus p must be greater than 3".to_string()));
        }

        if !p_value.bit(0) {
            return Err(Error::InvalidParams("modulus p must be odd".to_string()));
        }

        let one = BigUint::from(1u32);
        if g_value <= one || g_value >= &p_value - &one {
            return Err(Error::InvalidParams(
                "generator g must lie strictly between 1 and p-1".to_string(),
            ));
        }

        Ok(Self {
            p: Operand::from_biguint(&p_value),
            g: Operand::from_biguint(&g_value),
        })
    }

    /// The 2048-bit MODP group with a 256-bit prime order subgroup from RFC 5114.
    pub fn rfc5114_2048_256() -> Self {
        Self {
            p: Operand::parse(RFC5114_2048_256_P)
                .unwrap_or_else(|_| unreachable!("RFC 5114 modulus is valid hex")),
            g: Operand::parse(RFC5114_2048_256_G)
                .unwrap_or_else(|_| unreachable!("RFC 5114 generator is valid hex")),
        }
    }

    /// Returns the modulus `p`.
    pub fn p(&self) -> &Operand {
        &self.p
    }

    /// Returns the generator `g`.
    pub fn g(&self) -> &Operand {
        &self.g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::field::mod_pow;

    #[test]
    fn rfc5114_group_passes_validation() {
        let preset = GroupParameters::rfc5114_2048_256();
        let validated = GroupParameters::new(preset.p().clone(), preset.g().clone()).unwrap();
        assert_eq!(validated, preset);
        assert_eq!(preset.p().to_biguint().unwrap().bits(), 2048);
    }

    #[test]
    fn rfc5114_generator_has_subgroup_order() {
        let preset = GroupParameters::rfc5114_2048_256();
        let p = preset.p().to_biguint().unwrap();
        let g = preset.g().to_biguint().unwrap();
        let q = BigUint::parse_bytes(
            b"8CF83642A709A097B447997640129DA299B1A47D1EB3750BA308B0FE64F5FBD3",
            16,
        )
        .unwrap();

        assert_eq!(mod_pow(&g, &q, &p).unwrap(), BigUint::from(1u32));
    }

    #[test]
    fn rejects_bad_parameters() {
        let even = GroupParameters::new(Operand::from(24), Operand::from(5));
        assert!(matches!(even, Err(Error::InvalidParams(_))));

        let tiny = GroupParameters::new(Operand::from(3), Operand::from(2));
        assert!(matches!(tiny, Err(Error::InvalidParams(_))));

        let trivial_g = GroupParameters::new(Operand::from(23), Operand::from(1));
        assert!(matches!(trivial_g, Err(Error::InvalidParams(_))));

        let order_two = GroupParameters::new(Operand::from(23), Operand::from(22));
        assert!(matches!(order_two, Err(Error::InvalidParams(_))));
    }
}

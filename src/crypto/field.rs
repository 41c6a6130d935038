use num_bigint::BigUint;
use num_traits::Zero;

use crate::{Error, Result};

fn check_modulus(modulus: &BigUint) -> Result<()> {
    if modulus.is_zero() {
        return Err(Error::InvalidParams("modulus cannot be zero".to_string()));
    }
    Ok(())
}

/// Computes `base^exp mod modulus`.
///
/// `BigUint::modpow` panics on a zero modulus; this returns an error instead.
pub fn mod_pow(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> Result<BigUint> {
    check_modulus(modulus)?;
    Ok(base.modpow(exp, modulus))
}

/// Computes `a * b mod modulus`.
pub fn mod_mul(a: &BigUint, b: &BigUint, modulus: &BigUint) -> Result<BigUint> {
    check_modulus(modulus)?;
    Ok((a * b) % modulus)
}

/// Computes `a + b mod modulus`.
pub fn mod_add(a: &BigUint, b: &BigUint, modulus: &BigUint) -> Result<BigUint> {
    check_modulus(modulus)?;
    Ok((a + b) % modulus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values() {
        let p = BigUint::from(23u32);
        assert_eq!(
            mod_pow(&BigUint::from(5u32), &BigUint::from(6u32), &p).unwrap(),
            BigUint::from(8u32)
        );
        assert_eq!(
            mod_mul(&BigUint::from(7u32), &BigUint::from(9u32), &p).unwrap(),
            BigUint::from(17u32)
        );
        assert_eq!(
            mod_add(&BigUint::from(20u32), &BigUint::from(9u32), &p).unwrap(),
            BigUint::from(6u32)
        );
    }

    #[test]
    fn zero_modulus_is_an_error() {
        let zero = BigUint::zero();
        let one = BigUint::from(1u32);
        assert!(matches!(mod_pow(&one, &one, &zero), Err(Error::InvalidParams(_))));
        assert!(matches!(mod_mul(&one, &one, &zero), Err(Error::InvalidParams(_))));
        assert!(matches!(mod_add(&one, &one, &zero), Err(Error::InvalidParams(_))));
    }
}

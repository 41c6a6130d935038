//! Hexadecimal string encoding for arbitrary-precision operands.

use core::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize};
use zeroize::Zeroize;

use crate::{Error, Result};

/// Upper bound on the hex length of an operand (8192-bit values).
pub const MAX_OPERAND_HEX_LEN: usize = 2048;

/// An arbitrary-precision non-negative integer in its wire form.
///
/// Always non-empty lowercase hexadecimal without a `0x` prefix. Every value
/// that crosses the client/verifier boundary (`p`, `g`, `y`, `c`, `res`) is an
/// `Operand`; the protocol layers never look inside one.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Zeroize)]
#[serde(transparent)]
pub struct Operand(String);

impl Operand {
    /// Parses and normalises a hex string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperand`] if the string is empty, too long, or
    /// contains anything but hex digits.
    pub fn parse(encoded: &str) -> Result<Self> {
        if encoded.is_empty() {
            return Err(Error::InvalidOperand("operand is empty".to_string()));
        }

        if encoded.len() > MAX_OPERAND_HEX_LEN {
            return Err(Error::InvalidOperand(format!(
                "operand exceeds {MAX_OPERAND_HEX_LEN} hex digits"
            )));
        }

        if !encoded.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidOperand(format!(
                "'{encoded}' is not a hexadecimal number"
            )));
        }

        Ok(Self(encoded.to_ascii_lowercase()))
    }

    /// Encodes an integer.
    pub fn from_biguint(value: &BigUint) -> Self {
        Self(value.to_str_radix(16))
    }

    /// Decodes the integer.
    pub fn to_biguint(&self) -> Result<BigUint> {
        BigUint::parse_bytes(self.0.as_bytes(), 16)
            .ok_or_else(|| Error::InvalidOperand(format!("'{}' is not a hexadecimal number", self.0)))
    }

    /// Returns the hex encoding.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&BigUint> for Operand {
    fn from(value: &BigUint) -> Self {
        Self::from_biguint(value)
    }
}

impl From<u64> for Operand {
    fn from(value: u64) -> Self {
        Self(format!("{value:x}"))
    }
}

impl core::str::FromStr for Operand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() > 16 {
            write!(f, "Operand({}..)", &self.0[..16])
        } else {
            write!(f, "Operand({})", self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Operand {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        Self::parse(&encoded).map_err(serde::de::Error::custom)
    }
}

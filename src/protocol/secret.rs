use core::fmt;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Error, Operand, Result};

/// Domain separation prefix for the Argon2 salt.
const SALT_DST: &[u8] = b"dl-zkpp-v1-";

/// How a password becomes the secret exponent `x`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecretEncoding {
    /// UTF-16 code units in hex, concatenated. Matches the browser client;
    /// not a key-derivation function.
    #[default]
    CharCodes,
    /// Argon2 over the password with a salt derived from `realm`.
    Argon2 {
        /// Stable per-deployment context, e.g. the verifier's origin.
        realm: String,
    },
}

/// The password-derived exponent `x`.
///
/// Never leaves the client: it is not serializable, its `Debug` output is
/// redacted, and it is zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    x: Operand,
}

impl Secret {
    /// Derives the secret from a password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperand`] for an empty password and
    /// [`Error::SecretDerivation`] if Argon2 fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dl_zkpp::{Secret, SecretEncoding};
    ///
    /// let secret = Secret::from_password("ab", &SecretEncoding::CharCodes).unwrap();
    /// assert_eq!(secret.expose().as_str(), "6162");
    /// ```
    pub fn from_password(password: &str, encoding: &SecretEncoding) -> Result<Self> {
        if password.is_empty() {
            return Err(Error::InvalidOperand("password is empty".to_string()));
        }

        let mut encoded = match encoding {
            SecretEncoding::CharCodes => encode_char_codes(password),
            SecretEncoding::Argon2 { realm } => derive_argon2(password, realm)?,
        };

        let x = Operand::parse(&encoded);
        encoded.zeroize();

        Ok(Self { x: x? })
    }

    /// Wraps an already derived exponent.
    pub fn from_operand(x: Operand) -> Self {
        Self { x }
    }

    /// Returns the exponent for use by the prover.
    pub fn expose(&self) -> &Operand {
        &self.x
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

fn encode_char_codes(password: &str) -> String {
    password
        .encode_utf16()
        .map(|unit| format!("{unit:x}"))
        .collect()
}

fn derive_argon2(password: &str, realm: &str) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(SALT_DST);
    hasher.update(realm.as_bytes());
    let digest = hasher.finalize();

    let salt = SaltString::encode_b64(&digest[..16])
        .map_err(|e| Error::SecretDerivation(format!("salt encoding failed: {e}")))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::SecretDerivation(format!("password hashing failed: {e}")))?;

    let output = hash
        .hash
        .ok_or_else(|| Error::SecretDerivation("password hash has no output".to_string()))?;

    Ok(hex::encode(output.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_codes_match_browser_encoding() {
        let secret = Secret::from_password("ab", &SecretEncoding::CharCodes).unwrap();
        assert_eq!(secret.expose().as_str(), "6162");

        let secret = Secret::from_password("\n!", &SecretEncoding::CharCodes).unwrap();
        assert_eq!(secret.expose().as_str(), "a21");
    }

    #[test]
    fn char_codes_use_utf16_units() {
        let secret = Secret::from_password("é😀", &SecretEncoding::CharCodes).unwrap();
        assert_eq!(secret.expose().as_str(), "e9d83dde00");
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(matches!(
            Secret::from_password("", &SecretEncoding::CharCodes),
            Err(Error::InvalidOperand(_))
        ));
    }

    #[test]
    fn argon2_is_deterministic_per_realm() {
        let encoding = SecretEncoding::Argon2 {
            realm: "example.org".to_string(),
        };
        let a = Secret::from_password("hunter2", &encoding).unwrap();
        let b = Secret::from_password("hunter2", &encoding).unwrap();
        assert_eq!(a.expose(), b.expose());
        assert_eq!(a.expose().as_str().len(), 64);

        let other_realm = SecretEncoding::Argon2 {
            realm: "example.net".to_string(),
        };
        let c = Secret::from_password("hunter2", &other_realm).unwrap();
        assert_ne!(a.expose(), c.expose());
    }

    #[test]
    fn debug_is_redacted() {
        let secret = Secret::from_password("ab", &SecretEncoding::CharCodes).unwrap();
        assert_eq!(format!("{secret:?}"), "Secret(<redacted>)");
    }
}

//! Password-based key derivation using PBKDF2-HMAC-SHA1.
//!
//! The password and salt are stretched for the configured number of
//! rounds into an AES key of 128, 192 or 256 bits.  The derivation is
//! deterministic, which is what makes a vault file re-openable.

use std::fmt;

use hmac::Hmac;
use sha1::Sha1;
use zeroize::Zeroize;

use super::keys::DerivedSecret;
use crate::errors::{Result, VaultError};

/// Supported AES key sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum KeySize {
    Aes128,
    Aes192,
    #[default]
    Aes256,
}

impl KeySize {
    /// Key size in bits.
    pub const fn bits(self) -> u32 {
        match self {
            KeySize::Aes128 => 128,
            KeySize::Aes192 => 192,
            KeySize::Aes256 => 256,
        }
    }

    /// Key size in bytes.
    pub const fn bytes(self) -> usize {
        (self.bits() / 8) as usize
    }
}

impl TryFrom<u32> for KeySize {
    type Error = VaultError;

    fn try_from(bits: u32) -> Result<Self> {
        match bits {
            128 => Ok(KeySize::Aes128),
            192 => Ok(KeySize::Aes192),
            256 => Ok(KeySize::Aes256),
            other => Err(VaultError::InvalidConfig(format!(
                "unsupported key size {other} — only 128, 192 and 256 bits are allowed"
            ))),
        }
    }
}

impl fmt::Display for KeySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// PBKDF2 parameters for one vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Number of PBKDF2 rounds (default: 65 536).
    pub iterations: u32,
    /// Size of the derived AES key (default: 256 bits).
    pub key_size: KeySize,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: 65_536,
            key_size: KeySize::default(),
        }
    }
}

/// Derive the vault secret from a password and salt.
///
/// The same password + salt + params will always produce the same key.
pub fn derive_secret(password: &[u8], salt: &[u8], params: &KdfParams) -> Result<DerivedSecret> {
    if params.iterations < 1 {
        return Err(VaultError::Initialization {
            message: "PBKDF2 iterations must be at least 1".into(),
            source: None,
        });
    }

    let mut key = vec![0u8; params.key_size.bytes()];
    pbkdf2::pbkdf2::<Hmac<Sha1>>(password, salt, params.iterations, &mut key).map_err(|e| {
        key.zeroize();
        VaultError::initialization("PBKDF2 rejected the key specification", e.to_string())
    })?;

    tracing::debug!(
        key_size = params.key_size.bits(),
        iterations = params.iterations,
        "derived vault secret"
    );
    Ok(DerivedSecret::new(key, params.key_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_size_accepts_only_aes_sizes() {
        assert_eq!(KeySize::try_from(128).unwrap(), KeySize::Aes128);
        assert_eq!(KeySize::try_from(192).unwrap(), KeySize::Aes192);
        assert_eq!(KeySize::try_from(256).unwrap(), KeySize::Aes256);
        assert!(KeySize::try_from(0).is_err());
        assert!(KeySize::try_from(512).is_err());
    }

    #[test]
    fn zero_iterations_rejected() {
        let params = KdfParams {
            iterations: 0,
            key_size: KeySize::Aes128,
        };
        let err = derive_secret(b"pw", b"salt", &params).unwrap_err();
        assert!(matches!(err, VaultError::Initialization { .. }));
    }

    #[test]
    fn matches_rfc6070_vector() {
        // RFC 6070, test case 2 (truncated to 128 bits).
        let params = KdfParams {
            iterations: 2,
            key_size: KeySize::Aes128,
        };
        let secret = derive_secret(b"password", b"salt", &params).unwrap();
        assert_eq!(
            hex::encode(secret.as_bytes()),
            "ea6c014dc72d6f8ccd1ed92ace1d41f0"
        );
    }
}

//! Cryptographic primitives for Lockbox.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA1 password-based key derivation (`kdf`)
//! - The zeroizing `DerivedSecret` key holder (`keys`)
//! - AES-CBC encryption and decryption with a fresh IV per call (`encryption`)

pub mod encryption;
pub mod kdf;
pub mod keys;

use thiserror::Error;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_secret, ...};
pub use encryption::{decrypt, decrypt_hex, encrypt, IV_LEN};
pub use kdf::{derive_secret, KdfParams, KeySize};
pub use keys::DerivedSecret;

/// Low-level failure of a cipher or MAC primitive.
///
/// Never surfaces on its own from the vault API: it is attached as the
/// `source` of a `VaultError::Operation` or `VaultError::Initialization`.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: {0} bytes")]
    InvalidKeyLength(usize),

    #[error("malformed IV: expected {expected} bytes, got {actual}")]
    InvalidIv { expected: usize, actual: usize },

    #[error("illegal block size: {0} bytes is not a positive multiple of the block size")]
    IllegalBlockSize(usize),

    #[error("bad padding")]
    BadPadding,

    #[error("ciphertext is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("MAC key rejected: {0}")]
    MacKey(String),

    #[error("{0} exceeds the 32-bit length limit")]
    TooLarge(&'static str),
}

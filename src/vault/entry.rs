//! Entry types exchanged with the vault.
//!
//! - `UnsecureEntry`: a plaintext key/value produced by the caller.
//! - `SecureEntry`: the encrypted form handed back to callers.
//! - `EncryptedRecord`: a `SecureEntry` plus the IV it was encrypted with.
//!   This is what the store keeps and what codecs read and write.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A plaintext key/value pair.
///
/// Equality is defined over key and value; the timestamp is ignored.
/// The value is wiped from memory when the entry is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct UnsecureEntry {
    #[zeroize(skip)]
    key: String,
    value: String,
    #[zeroize(skip)]
    created_at: DateTime<Utc>,
}

impl UnsecureEntry {
    /// Create an entry stamped with the current time.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_timestamp(key, value, Utc::now())
    }

    /// Create an entry with an explicit creation time.
    pub fn with_timestamp(
        key: impl Into<String>,
        value: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            created_at,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The plaintext value.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl PartialEq for UnsecureEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value
    }
}

impl Eq for UnsecureEntry {}

impl fmt::Debug for UnsecureEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the plaintext.
        f.debug_struct("UnsecureEntry")
            .field("key", &self.key)
            .field("value", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// An encrypted key/value pair as returned by the vault.
///
/// Equality and hashing use `(key, cipher_hex)` only, so two reads of the
/// same stored entry compare equal regardless of timestamps.
#[derive(Debug, Clone)]
pub struct SecureEntry {
    key: String,
    cipher_hex: String,
    created_at: DateTime<Utc>,
}

impl SecureEntry {
    /// Create an entry stamped with the current time.
    pub fn new(key: impl Into<String>, cipher_hex: impl Into<String>) -> Self {
        Self::with_timestamp(key, cipher_hex, Utc::now())
    }

    pub fn with_timestamp(
        key: impl Into<String>,
        cipher_hex: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            cipher_hex: cipher_hex.into(),
            created_at,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Hex-encoded ciphertext.
    pub fn cipher_hex(&self) -> &str {
        &self.cipher_hex
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl PartialEq for SecureEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.cipher_hex == other.cipher_hex
    }
}

impl Eq for SecureEntry {}

impl Hash for SecureEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.cipher_hex.hash(state);
    }
}

/// A stored entry together with the IV needed to decrypt it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub entry: SecureEntry,
    pub iv: Vec<u8>,
}

impl EncryptedRecord {
    pub fn new(entry: SecureEntry, iv: Vec<u8>) -> Self {
        Self { entry, iv }
    }

    /// Shorthand for `self.entry.key()`.
    pub fn key(&self) -> &str {
        self.entry.key()
    }
}

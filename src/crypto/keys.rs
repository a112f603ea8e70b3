//! The derived vault secret.
//!
//! One `DerivedSecret` is created per vault when it is constructed and
//! lives exactly as long as the vault.  The same bytes key both the AES
//! cipher and the HMAC over the vault file.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::kdf::KeySize;

/// AES key material that automatically zeroes its memory when dropped.
///
/// Never serialized; `Debug` output is redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedSecret {
    bytes: Vec<u8>,
    #[zeroize(skip)]
    key_size: KeySize,
}

impl DerivedSecret {
    /// Wrap raw key bytes produced by the KDF.
    pub(crate) fn new(bytes: Vec<u8>, key_size: KeySize) -> Self {
        Self { bytes, key_size }
    }

    /// Access the raw key bytes (e.g. to key the cipher or the MAC).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The AES variant this key is bound to.
    pub fn key_size(&self) -> KeySize {
        self.key_size
    }
}

impl fmt::Debug for DerivedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedSecret")
            .field("key_size", &self.key_size)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

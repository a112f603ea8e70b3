//! In-memory encrypted entry store.
//!
//! `EncryptedStore` holds one `EncryptedRecord` per key in a sharded
//! concurrent map, so it can be shared between threads behind a plain
//! `Arc` without any outer lock.  Values are encrypted on `write` and
//! only decrypted again by an explicit `translate`.

use dashmap::DashMap;
use zeroize::Zeroize;

use crate::crypto::{decrypt_hex, derive_secret, encrypt, DerivedSecret, KdfParams};
use crate::errors::{Result, VaultError};

use super::entry::{EncryptedRecord, SecureEntry, UnsecureEntry};

/// Concurrent map of key -> encrypted record, plus the secret that
/// encrypts them.
pub struct EncryptedStore {
    /// The derived key (zeroized on drop).
    secret: DerivedSecret,

    /// Encrypted entries by key.
    records: DashMap<String, EncryptedRecord>,
}

impl EncryptedStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Derive the secret from `password` and `salt` and start empty.
    pub fn new(password: &str, salt: &[u8], params: &KdfParams) -> Result<Self> {
        let secret = derive_secret(password.as_bytes(), salt, params)?;
        Ok(Self::from_secret(secret))
    }

    /// Start empty with an already-derived secret.
    pub fn from_secret(secret: DerivedSecret) -> Self {
        Self {
            secret,
            records: DashMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Entry operations
    // ------------------------------------------------------------------

    /// Snapshot of every stored entry.  Order is unspecified.
    pub fn read_all(&self) -> Vec<SecureEntry> {
        self.records
            .iter()
            .map(|record| record.value().entry.clone())
            .collect()
    }

    /// The stored entry for `key`, if any.
    pub fn read(&self, key: &str) -> Option<SecureEntry> {
        self.records.get(key).map(|record| record.entry.clone())
    }

    /// Encrypt `entry` and insert it, replacing any previous record for
    /// the same key.
    pub fn write(&self, entry: &UnsecureEntry) -> Result<SecureEntry> {
        let (ciphertext, iv) = encrypt(&self.secret, entry.value().as_bytes())
            .map_err(|e| VaultError::operation(format!("failed to encrypt '{}'", entry.key()), e))?;

        let secure = SecureEntry::with_timestamp(
            entry.key(),
            hex::encode(ciphertext),
            entry.created_at(),
        );
        let replaced = self
            .records
            .insert(
                entry.key().to_string(),
                EncryptedRecord::new(secure.clone(), iv.to_vec()),
            )
            .is_some();

        tracing::debug!(key = entry.key(), replaced, "stored encrypted entry");
        Ok(secure)
    }

    /// Remove `key`, returning the entry that was stored under it.
    pub fn delete(&self, key: &str) -> Option<SecureEntry> {
        let removed = self.records.remove(key).map(|(_, record)| record.entry);
        tracing::debug!(key, removed = removed.is_some(), "deleted entry");
        removed
    }

    /// Decrypt a previously returned entry.
    ///
    /// Fails with `NotFound` if the key is gone or if `entry` is not the
    /// entry currently stored under it (e.g. it was overwritten since).
    pub fn translate(&self, entry: &SecureEntry) -> Result<UnsecureEntry> {
        // Clone out so the shard lock is released before decrypting.
        let record = self
            .records
            .get(entry.key())
            .map(|record| record.value().clone())
            .ok_or_else(|| VaultError::NotFound(entry.key().to_string()))?;

        if record.entry != *entry {
            tracing::debug!(key = entry.key(), "translate called with a stale entry");
            return Err(VaultError::NotFound(entry.key().to_string()));
        }

        let plaintext = decrypt_hex(&self.secret, record.entry.cipher_hex(), &record.iv)
            .map_err(|e| VaultError::operation(format!("failed to decrypt '{}'", entry.key()), e))?;

        let value = String::from_utf8(plaintext).map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            bad_bytes.zeroize();
            VaultError::operation(
                format!("decrypted value of '{}' is not valid UTF-8", entry.key()),
                "invalid UTF-8",
            )
        })?;

        Ok(UnsecureEntry::with_timestamp(
            record.entry.key(),
            value,
            record.entry.created_at(),
        ))
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn secret(&self) -> &DerivedSecret {
        &self.secret
    }

    // ------------------------------------------------------------------
    // Persistence support
    // ------------------------------------------------------------------

    /// Point-in-time copy of every record, sorted by key.
    pub(crate) fn snapshot(&self) -> Vec<EncryptedRecord> {
        let mut records: Vec<EncryptedRecord> = self
            .records
            .iter()
            .map(|record| record.value().clone())
            .collect();
        records.sort_by(|a, b| a.key().cmp(b.key()));
        records
    }

    /// Replace the whole content with freshly loaded records.
    pub(crate) fn replace_all(&self, records: Vec<EncryptedRecord>) {
        self.records.clear();
        for record in records {
            self.records.insert(record.key().to_string(), record);
        }
    }
}

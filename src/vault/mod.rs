//! Vault module: encrypted key/value storage.
//!
//! This module provides:
//! - Entry types (`entry`)
//! - The concurrent in-memory `EncryptedStore` (`store`)
//! - The file-backed `FileVault` with MAC verification (`file`, `mac`)
//! - Raw, XML and JSON wire formats (`codec`)
//! - A fluent `VaultBuilder` (`builder`)

pub mod builder;
pub mod codec;
pub mod entry;
pub mod file;
pub mod mac;
pub mod store;

use crate::errors::Result;

// Re-export the most commonly used items.
pub use builder::{StorageMode, VaultBuilder};
pub use codec::{JsonCodec, RawCodec, StorageFormat, WireCodec, XmlCodec};
pub use entry::{EncryptedRecord, SecureEntry, UnsecureEntry};
pub use file::{FileVault, JsonFileVault, RawFileVault, XmlFileVault};
pub use store::EncryptedStore;

/// Operations shared by every vault, whatever its storage.
///
/// All methods take `&self`; implementations are safe to share between
/// threads.
pub trait Vault: Send + Sync {
    /// Snapshot of every stored entry, in no particular order.
    fn read_all(&self) -> Vec<SecureEntry>;

    fn read(&self, key: &str) -> Option<SecureEntry>;

    /// Encrypt and store `entry`, replacing any entry with the same key.
    fn write(&self, entry: &UnsecureEntry) -> Result<SecureEntry>;

    fn delete(&self, key: &str) -> Option<SecureEntry>;

    /// Decrypt an entry previously returned by this vault.
    fn translate(&self, entry: &SecureEntry) -> Result<UnsecureEntry>;

    /// Flush pending changes.  A no-op for vaults without storage.
    fn persist(&self) -> Result<()> {
        Ok(())
    }

    /// The file format backing this vault, if any.
    fn format(&self) -> Option<StorageFormat> {
        None
    }
}

impl Vault for EncryptedStore {
    fn read_all(&self) -> Vec<SecureEntry> {
        EncryptedStore::read_all(self)
    }

    fn read(&self, key: &str) -> Option<SecureEntry> {
        EncryptedStore::read(self, key)
    }

    fn write(&self, entry: &UnsecureEntry) -> Result<SecureEntry> {
        EncryptedStore::write(self, entry)
    }

    fn delete(&self, key: &str) -> Option<SecureEntry> {
        EncryptedStore::delete(self, key)
    }

    fn translate(&self, entry: &SecureEntry) -> Result<UnsecureEntry> {
        EncryptedStore::translate(self, entry)
    }
}

impl<C: WireCodec> Vault for FileVault<C> {
    fn read_all(&self) -> Vec<SecureEntry> {
        FileVault::read_all(self)
    }

    fn read(&self, key: &str) -> Option<SecureEntry> {
        FileVault::read(self, key)
    }

    fn write(&self, entry: &UnsecureEntry) -> Result<SecureEntry> {
        FileVault::write(self, entry)
    }

    fn delete(&self, key: &str) -> Option<SecureEntry> {
        FileVault::delete(self, key)
    }

    fn translate(&self, entry: &SecureEntry) -> Result<UnsecureEntry> {
        FileVault::translate(self, entry)
    }

    fn persist(&self) -> Result<()> {
        FileVault::persist(self)
    }

    fn format(&self) -> Option<StorageFormat> {
        Some(self.codec().format())
    }
}

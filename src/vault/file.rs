//! File-backed vault.
//!
//! `FileVault` wraps an `EncryptedStore` and keeps it in sync with one
//! file on disk, written in the format of its `WireCodec`.
//!
//! The file is read and MAC-checked once, when the vault is opened.
//! Mutations only set a dirty flag; `persist` writes the whole entry set
//! back if (and only if) that flag was set.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::crypto::{DerivedSecret, KdfParams};
use crate::errors::{Result, VaultError};

use super::codec::{JsonCodec, RawCodec, WireCodec, XmlCodec};
use super::entry::{SecureEntry, UnsecureEntry};
use super::mac::{compute_mac, verify_mac};
use super::store::EncryptedStore;

/// File vault in the raw binary format.
pub type RawFileVault = FileVault<RawCodec>;
/// File vault in the XML format.
pub type XmlFileVault = FileVault<XmlCodec>;
/// File vault in the JSON format.
pub type JsonFileVault = FileVault<JsonCodec>;

/// An `EncryptedStore` persisted to a single file.
pub struct FileVault<C: WireCodec> {
    path: PathBuf,
    store: EncryptedStore,
    codec: C,
    /// Set when the store holds changes that are not in the file yet.
    dirty: AtomicBool,
    /// Serializes snapshot-and-rename so files land in snapshot order.
    write_lock: Mutex<()>,
}

impl<C: WireCodec> FileVault<C> {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Derive the secret and open (or start) the vault at `path`.
    pub fn open(
        path: impl Into<PathBuf>,
        codec: C,
        password: &str,
        salt: &[u8],
        params: &KdfParams,
    ) -> Result<Self> {
        let store = EncryptedStore::new(password, salt, params)?;
        Self::with_store(path.into(), codec, store)
    }

    /// Open the vault at `path` with an already-derived secret.
    pub fn open_with_secret(path: impl Into<PathBuf>, codec: C, secret: DerivedSecret) -> Result<Self> {
        Self::with_store(path.into(), codec, EncryptedStore::from_secret(secret))
    }

    fn with_store(path: PathBuf, codec: C, store: EncryptedStore) -> Result<Self> {
        let vault = Self {
            path,
            store,
            codec,
            dirty: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        };
        vault.load()?;
        Ok(vault)
    }

    /// Populate the store from the file, verifying its MAC.
    fn load(&self) -> Result<()> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no vault file yet, starting empty");
                return Ok(());
            }
            Err(e) => {
                return Err(VaultError::initialization(
                    format!("cannot read vault file {}", self.path.display()),
                    e,
                ));
            }
        };

        if data.is_empty() {
            tracing::info!(path = %self.path.display(), "vault file is empty, starting empty");
            return Ok(());
        }

        let decoded = self.codec.decode(&data).inspect_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "vault file failed to decode");
        })?;

        let mut seen = std::collections::HashSet::with_capacity(decoded.records.len());
        for record in &decoded.records {
            if !seen.insert(record.key()) {
                tracing::error!(key = record.key(), "duplicate key in vault file");
                return Err(VaultError::corrupted(format!(
                    "duplicate key '{}'",
                    record.key()
                )));
            }
        }

        let valid = verify_mac(self.store.secret(), &decoded.records, &decoded.mac)
            .map_err(|e| VaultError::initialization("cannot compute the vault MAC", e))?;
        if !valid {
            tracing::error!(path = %self.path.display(), "vault MAC mismatch");
            return Err(VaultError::corrupted(
                "MAC mismatch: the file was modified or the password is wrong",
            ));
        }

        let count = decoded.records.len();
        self.store.replace_all(decoded.records);
        tracing::info!(
            path = %self.path.display(),
            format = %self.codec.format(),
            count,
            "loaded vault"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entry operations
    // ------------------------------------------------------------------

    pub fn read_all(&self) -> Vec<SecureEntry> {
        self.store.read_all()
    }

    pub fn read(&self, key: &str) -> Option<SecureEntry> {
        self.store.read(key)
    }

    /// Encrypt and store `entry`, marking the vault dirty.
    pub fn write(&self, entry: &UnsecureEntry) -> Result<SecureEntry> {
        let secure = self.store.write(entry)?;
        self.dirty.store(true, Ordering::Release);
        Ok(secure)
    }

    /// Remove `key`.  Only marks the vault dirty if something was removed.
    pub fn delete(&self, key: &str) -> Option<SecureEntry> {
        let removed = self.store.delete(key);
        if removed.is_some() {
            self.dirty.store(true, Ordering::Release);
        }
        removed
    }

    pub fn translate(&self, entry: &SecureEntry) -> Result<UnsecureEntry> {
        self.store.translate(entry)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write the entry set to disk if it changed since the last persist.
    ///
    /// Only the caller that flips the dirty flag performs the write; any
    /// concurrent caller returns immediately.  A mutation that lands while
    /// a write is in flight is picked up by the next `persist`.  Writers
    /// take the snapshot under a lock, so an older snapshot never
    /// replaces a newer file.
    pub fn persist(&self) -> Result<()> {
        if self
            .dirty
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(path = %self.path.display(), "vault clean, nothing to persist");
            return Ok(());
        }

        self.write_file().inspect_err(|e| {
            self.dirty.store(true, Ordering::Release);
            tracing::warn!(path = %self.path.display(), error = %e, "persist failed, vault stays dirty");
        })
    }

    fn write_file(&self) -> Result<()> {
        // A poisoned lock guards no data; keep writing.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let records = self.store.snapshot();
        let mac = compute_mac(self.store.secret(), &records)
            .map_err(|e| VaultError::operation("failed to compute the vault MAC", e))?;
        let data = self.codec.encode(&records, &mac)?;

        write_atomic(&self.path, &data).map_err(|e| {
            VaultError::operation(format!("failed to write {}", self.path.display()), e)
        })?;

        tracing::info!(
            path = %self.path.display(),
            format = %self.codec.format(),
            count = records.len(),
            "persisted vault"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Path to the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are changes not yet written to disk.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

/// Write `data` to `path` via a temp file in the same directory + rename.
///
/// The temp name is unique per call so that two overlapping writers never
/// share a file.
fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "vault path has no file name"))?
        .to_string_lossy();
    let tmp_path = path.with_file_name(format!(
        ".{file_name}.{:016x}.tmp",
        rand::random::<u64>()
    ));

    let result = (|| {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

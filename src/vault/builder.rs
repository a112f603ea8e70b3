//! Fluent construction of vaults.
//!
//! ```no_run
//! use lockbox::vault::VaultBuilder;
//!
//! let vault = VaultBuilder::new()
//!     .password("correct horse battery staple")
//!     .salt("pepper12")
//!     .iterations(100_000)
//!     .key_size(256)
//!     .json_file("secrets.json")
//!     .build()?;
//! # Ok::<(), lockbox::errors::VaultError>(())
//! ```

use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::crypto::{derive_secret, DerivedSecret, KdfParams, KeySize};
use crate::errors::{Result, VaultError};

use super::codec::{JsonCodec, RawCodec, StorageFormat, WireCodec, XmlCodec};
use super::file::FileVault;
use super::store::EncryptedStore;
use super::Vault;

/// Where the vault keeps its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// Entries live only as long as the process.
    #[default]
    InMemory,
    /// Entries are persisted to a file in the given format.
    File(StorageFormat),
}

/// Builder for every kind of vault.
///
/// Defaults: 65 536 iterations, 256-bit key, in-memory storage.  A
/// password and a non-empty salt are always required.
#[derive(Default)]
pub struct VaultBuilder {
    password: Option<Zeroizing<String>>,
    salt: Option<Vec<u8>>,
    iterations: Option<u32>,
    key_size: Option<u32>,
    mode: StorageMode,
    path: Option<PathBuf>,
}

impl VaultBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    pub fn salt(mut self, salt: impl AsRef<[u8]>) -> Self {
        self.salt = Some(salt.as_ref().to_vec());
        self
    }

    /// Number of PBKDF2 rounds; must be positive.
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Key size in bits: 128, 192 or 256.
    pub fn key_size(mut self, bits: u32) -> Self {
        self.key_size = Some(bits);
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.mode = StorageMode::InMemory;
        self.path = None;
        self
    }

    pub fn raw_file(self, path: impl Into<PathBuf>) -> Self {
        self.file(StorageFormat::Raw, path)
    }

    pub fn xml_file(self, path: impl Into<PathBuf>) -> Self {
        self.file(StorageFormat::Xml, path)
    }

    pub fn json_file(self, path: impl Into<PathBuf>) -> Self {
        self.file(StorageFormat::Json, path)
    }

    /// Persist to `path` in `format`.
    pub fn file(mut self, format: StorageFormat, path: impl Into<PathBuf>) -> Self {
        self.mode = StorageMode::File(format);
        self.path = Some(path.into());
        self
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    // ------------------------------------------------------------------
    // Build
    // ------------------------------------------------------------------

    /// Validate the inputs and build the configured vault.
    pub fn build(self) -> Result<Box<dyn Vault>> {
        match self.mode {
            StorageMode::InMemory => Ok(Box::new(self.build_in_memory()?)),
            StorageMode::File(StorageFormat::Raw) => Ok(Box::new(self.build_file(RawCodec)?)),
            StorageMode::File(StorageFormat::Xml) => Ok(Box::new(self.build_file(XmlCodec)?)),
            StorageMode::File(StorageFormat::Json) => Ok(Box::new(self.build_file(JsonCodec)?)),
        }
    }

    /// Build an in-memory store, ignoring any configured file.
    pub fn build_in_memory(self) -> Result<EncryptedStore> {
        let secret = self.derive()?;
        Ok(EncryptedStore::from_secret(secret))
    }

    /// Build a file vault with an explicit codec.
    ///
    /// A file path must be configured, and its format (if set through
    /// `file`/`*_file`) must match the codec.
    pub fn build_file<C: WireCodec>(self, codec: C) -> Result<FileVault<C>> {
        if let StorageMode::File(format) = self.mode {
            if format != codec.format() {
                return Err(VaultError::InvalidConfig(format!(
                    "storage format is {format} but a {} codec was supplied",
                    codec.format()
                )));
            }
        }
        let path = self
            .path
            .clone()
            .ok_or_else(|| VaultError::InvalidConfig("a vault file path is required".into()))?;
        validate_path(&path)?;

        let secret = self.derive()?;
        FileVault::open_with_secret(path, codec, secret)
    }

    /// Validated KDF parameters.
    pub fn kdf_params(&self) -> Result<KdfParams> {
        let iterations = self.iterations.unwrap_or(KdfParams::default().iterations);
        if iterations == 0 {
            return Err(VaultError::InvalidConfig(
                "iterations must be greater than 0".into(),
            ));
        }
        let key_size = match self.key_size {
            Some(bits) => KeySize::try_from(bits)?,
            None => KeySize::default(),
        };
        Ok(KdfParams {
            iterations,
            key_size,
        })
    }

    fn derive(&self) -> Result<DerivedSecret> {
        let password = self
            .password
            .as_ref()
            .ok_or_else(|| VaultError::InvalidConfig("a password is required".into()))?;
        let salt = match &self.salt {
            Some(salt) if !salt.is_empty() => salt,
            Some(_) => return Err(VaultError::InvalidConfig("the salt must not be empty".into())),
            None => return Err(VaultError::InvalidConfig("a salt is required".into())),
        };
        let params = self.kdf_params()?;
        derive_secret(password.as_bytes(), salt, &params)
    }
}

fn validate_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(VaultError::InvalidConfig("the vault file path is empty".into()));
    }
    if path.exists() && !path.is_file() {
        return Err(VaultError::InvalidConfig(format!(
            "{} exists but is not a regular file",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> VaultBuilder {
        VaultBuilder::new()
            .password("builder-password")
            .salt("builder-salt")
            .iterations(16)
            .key_size(128)
    }

    #[test]
    fn defaults_match_documentation() {
        let params = VaultBuilder::new().kdf_params().unwrap();
        assert_eq!(params.iterations, 65_536);
        assert_eq!(params.key_size, KeySize::Aes256);
        assert_eq!(VaultBuilder::new().mode(), StorageMode::InMemory);
    }

    #[test]
    fn missing_password_or_salt_rejected() {
        let err = VaultBuilder::new().salt("s").build().err().unwrap();
        assert!(matches!(err, VaultError::InvalidConfig(_)));

        let err = VaultBuilder::new().password("p").build().err().unwrap();
        assert!(matches!(err, VaultError::InvalidConfig(_)));

        let err = base().salt("").build().err().unwrap();
        assert!(matches!(err, VaultError::InvalidConfig(_)));
    }

    #[test]
    fn invalid_parameters_rejected() {
        assert!(matches!(
            base().iterations(0).build().err().unwrap(),
            VaultError::InvalidConfig(_)
        ));
        assert!(matches!(
            base().key_size(512).build().err().unwrap(),
            VaultError::InvalidConfig(_)
        ));
    }

    #[test]
    fn directory_path_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = base().raw_file(dir.path()).build().err().unwrap();
        assert!(matches!(err, VaultError::InvalidConfig(_)));
    }

    #[test]
    fn codec_must_match_format() {
        let dir = tempfile::tempdir().unwrap();
        let err = base()
            .xml_file(dir.path().join("v.xml"))
            .build_file(JsonCodec)
            .err()
            .unwrap();
        assert!(matches!(err, VaultError::InvalidConfig(_)));
    }

    #[test]
    fn builds_every_mode() {
        let dir = tempfile::tempdir().unwrap();
        for format in [StorageFormat::Raw, StorageFormat::Xml, StorageFormat::Json] {
            let vault = base()
                .file(format, dir.path().join(format!("v.{format}")))
                .build()
                .unwrap();
            assert_eq!(vault.format(), Some(format));
        }
        assert_eq!(base().in_memory().build().unwrap().format(), None);
    }
}

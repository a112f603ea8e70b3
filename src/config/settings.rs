use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};
use crate::vault::{StorageFormat, VaultBuilder};

/// Project-level configuration, loaded from `.lockbox.toml`.
///
/// Every field has a default so Lockbox works without any config file
/// at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Vault file path, relative to the project root.
    #[serde(default = "default_vault_file")]
    pub vault_file: PathBuf,

    /// On-disk format of the vault file.
    #[serde(default)]
    pub format: StorageFormat,

    /// PBKDF2 rounds (default: 65 536).
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// AES key size in bits (default: 256).
    #[serde(default = "default_key_size")]
    pub key_size: u32,

    /// Key-derivation salt.  Usually supplied via `LOCKBOX_SALT` instead.
    #[serde(default)]
    pub salt: Option<String>,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_file() -> PathBuf {
    PathBuf::from("vault.lockbox")
}

fn default_iterations() -> u32 {
    65_536
}

fn default_key_size() -> u32 {
    256
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_file: default_vault_file(),
            format: StorageFormat::default(),
            iterations: default_iterations(),
            key_size: default_key_size(),
            salt: None,
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".lockbox.toml";

    /// Load settings from `<project_dir>/.lockbox.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        tracing::debug!(path = %config_path.display(), "loaded config file");
        Ok(settings)
    }

    /// Full path to the vault file.
    ///
    /// Absolute `vault_file` values are used as-is.
    pub fn vault_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_file)
    }

    /// A builder preloaded with these settings.  The password still has
    /// to be supplied, and the salt too if the settings do not carry one.
    pub fn vault_builder(&self, project_dir: &Path) -> VaultBuilder {
        let builder = VaultBuilder::new()
            .iterations(self.iterations)
            .key_size(self.key_size)
            .file(self.format, self.vault_path(project_dir));
        match &self.salt {
            Some(salt) => builder.salt(salt),
            None => builder,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::StorageMode;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.vault_file, Path::new("vault.lockbox"));
        assert_eq!(s.format, StorageFormat::Json);
        assert_eq!(s.iterations, 65_536);
        assert_eq!(s.key_size, 256);
        assert!(s.salt.is_none());
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.vault_file, Path::new("vault.lockbox"));
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
vault_file = "secrets/app.xml"
format = "xml"
iterations = 1024
key_size = 128
salt = "12345678"
"#;
        fs::write(tmp.path().join(".lockbox.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.vault_file, Path::new("secrets/app.xml"));
        assert_eq!(settings.format, StorageFormat::Xml);
        assert_eq!(settings.iterations, 1024);
        assert_eq!(settings.key_size, 128);
        assert_eq!(settings.salt.as_deref(), Some("12345678"));
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".lockbox.toml"), "format = \"raw\"\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.format, StorageFormat::Raw);
        // Rest should be defaults
        assert_eq!(settings.vault_file, Path::new("vault.lockbox"));
        assert_eq!(settings.iterations, 65_536);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".lockbox.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(matches!(result, Err(VaultError::ConfigError(_))));
    }

    #[test]
    fn load_errors_on_unknown_format() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".lockbox.toml"), "format = \"yaml\"\n").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn vault_path_joins_project_dir() {
        let s = Settings::default();
        let project = Path::new("/home/user/myproject");
        assert_eq!(
            s.vault_path(project),
            PathBuf::from("/home/user/myproject/vault.lockbox")
        );
    }

    #[test]
    fn vault_builder_carries_format_and_params() {
        let s = Settings {
            format: StorageFormat::Raw,
            iterations: 10,
            key_size: 192,
            ..Settings::default()
        };
        let builder = s.vault_builder(Path::new("/tmp/project"));
        assert_eq!(builder.mode(), StorageMode::File(StorageFormat::Raw));
        let params = builder.kdf_params().unwrap();
        assert_eq!(params.iterations, 10);
        assert_eq!(params.key_size.bits(), 192);
    }
}

//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;

use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::{StorageFormat, Vault};

/// Environment variable holding the vault password for scripted use.
pub const PASSWORD_ENV: &str = "LOCKBOX_PASSWORD";

/// Lockbox CLI: password-encrypted key/value vault.
#[derive(Parser)]
#[command(
    name = "lockbox",
    about = "Password-encrypted key/value vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault file (default: `vault_file` from .lockbox.toml)
    #[arg(long, global = true)]
    pub vault: Option<PathBuf>,

    /// Vault file format: raw, xml or json
    #[arg(long, global = true)]
    pub format: Option<StorageFormat>,

    /// Key-derivation salt
    #[arg(long, env = "LOCKBOX_SALT", hide_env_values = true, global = true)]
    pub salt: Option<String>,

    /// PBKDF2 iterations
    #[arg(long, global = true)]
    pub iterations: Option<u32>,

    /// AES key size in bits: 128, 192 or 256
    #[arg(long, global = true)]
    pub key_size: Option<u32>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Set an entry (add or replace)
    Set {
        /// Entry key (e.g. DATABASE_URL)
        key: String,
        /// Entry value (omit for interactive prompt)
        value: Option<String>,
    },

    /// Print an entry's decrypted value
    Get {
        /// Entry key
        key: String,
    },

    /// List all entries
    List,

    /// Delete an entry
    Delete {
        /// Entry key
        key: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Load the vault file and check its MAC
    Verify,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the vault password, trying in order:
/// 1. `LOCKBOX_PASSWORD` env var (CI/CD)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault password")
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Apply command-line overrides on top of file settings.
pub fn apply_overrides(cli: &Cli, mut settings: Settings) -> Settings {
    if let Some(path) = &cli.vault {
        settings.vault_file = path.clone();
    }
    if let Some(format) = cli.format {
        settings.format = format;
    }
    if let Some(salt) = &cli.salt {
        settings.salt = Some(salt.clone());
    }
    if let Some(iterations) = cli.iterations {
        settings.iterations = iterations;
    }
    if let Some(key_size) = cli.key_size {
        settings.key_size = key_size;
    }
    settings
}

/// Load `.lockbox.toml` from the current directory and apply overrides.
///
/// Returns the project directory next to the effective settings.
pub fn resolve_settings(cli: &Cli) -> Result<(PathBuf, Settings)> {
    let cwd = std::env::current_dir()?;
    let settings = apply_overrides(cli, Settings::load(&cwd)?);
    Ok((cwd, settings))
}

/// Open the configured vault, prompting for the password if needed.
pub fn open_vault(project_dir: &Path, settings: &Settings) -> Result<Box<dyn Vault>> {
    if settings.salt.is_none() {
        return Err(VaultError::CommandFailed(
            "no salt configured: pass --salt, set LOCKBOX_SALT or add `salt` to .lockbox.toml"
                .into(),
        ));
    }

    let password = prompt_password()?;
    settings
        .vault_builder(project_dir)
        .password(password.as_str())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("lockbox").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_overrides_keep_file_settings() {
        let cli = parse(&["list"]);
        let settings = Settings {
            salt: Some("from-file".into()),
            ..Settings::default()
        };
        let merged = apply_overrides(&cli, settings);
        assert_eq!(merged.vault_file, Path::new("vault.lockbox"));
        assert_eq!(merged.iterations, 65_536);
        // The salt may also come from LOCKBOX_SALT in the test environment.
        assert!(merged.salt.is_some());
    }

    #[test]
    fn flags_override_file_settings() {
        let cli = parse(&[
            "--vault",
            "other.xml",
            "--format",
            "XML",
            "--salt",
            "abc",
            "--iterations",
            "7",
            "--key-size",
            "128",
            "list",
        ]);
        let merged = apply_overrides(&cli, Settings::default());
        assert_eq!(merged.vault_file, Path::new("other.xml"));
        assert_eq!(merged.format, StorageFormat::Xml);
        assert_eq!(merged.salt.as_deref(), Some("abc"));
        assert_eq!(merged.iterations, 7);
        assert_eq!(merged.key_size, 128);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_vault_path_is_kept_verbatim() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"vault-\xff.json");
        let args = [OsStr::new("lockbox"), OsStr::new("--vault"), raw, OsStr::new("list")];
        let cli = Cli::try_parse_from(args).unwrap();

        let merged = apply_overrides(&cli, Settings::default());
        assert_eq!(merged.vault_file.as_os_str(), raw);
        assert_eq!(
            merged.vault_path(Path::new("/project")),
            Path::new("/project").join(raw)
        );
    }

    #[test]
    fn unknown_format_is_a_parse_error() {
        let result = Cli::try_parse_from(["lockbox", "--format", "yaml", "list"]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_accepted_after_subcommand() {
        let cli = parse(&["get", "KEY", "--iterations", "3"]);
        assert_eq!(cli.iterations, Some(3));
        assert!(matches!(cli.command, Commands::Get { ref key } if key == "KEY"));
    }
}

//! `lockbox get`: decrypt and print a single entry.

use crate::cli::{open_vault, resolve_settings, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `get` command.
pub fn execute(cli: &Cli, key: &str) -> Result<()> {
    let (project_dir, settings) = resolve_settings(cli)?;
    let vault = open_vault(&project_dir, &settings)?;

    let entry = vault
        .read(key)
        .ok_or_else(|| VaultError::NotFound(key.to_string()))?;

    // Decrypt and print the value to stdout.
    let plain = vault.translate(&entry)?;
    println!("{}", plain.value());

    Ok(())
}

//! `lockbox verify`: load the vault file and check its integrity.
//!
//! Opening a file vault already decodes it and checks the MAC, so a
//! corrupted or tampered file (or a wrong password) fails here with a
//! non-zero exit.

use crate::cli::output;
use crate::cli::{open_vault, resolve_settings, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `verify` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (project_dir, settings) = resolve_settings(cli)?;
    let path = settings.vault_path(&project_dir);

    if !path.is_file() {
        return Err(VaultError::CommandFailed(format!(
            "no vault file at {}",
            path.display()
        )));
    }

    let vault = open_vault(&project_dir, &settings)?;
    let count = vault.read_all().len();

    output::success(&format!(
        "{} is intact: {count} entr{}, {} format, MAC verified",
        path.display(),
        if count == 1 { "y" } else { "ies" },
        settings.format
    ));

    Ok(())
}

//! `lockbox delete`: remove an entry from the vault.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_vault, resolve_settings, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, key: &str, force: bool) -> Result<()> {
    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete entry '{key}'?"))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let (project_dir, settings) = resolve_settings(cli)?;
    let vault = open_vault(&project_dir, &settings)?;

    if vault.delete(key).is_none() {
        return Err(VaultError::NotFound(key.to_string()));
    }
    vault.persist()?;

    output::success(&format!("Deleted entry '{key}'"));

    Ok(())
}

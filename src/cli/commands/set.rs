//! `lockbox set`: add or replace an entry.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{open_vault, resolve_settings, Cli};
use crate::errors::{Result, VaultError};
use crate::vault::UnsecureEntry;

/// Execute the `set` command.
pub fn execute(cli: &Cli, key: &str, value: Option<&str>) -> Result<()> {
    if key.is_empty() {
        return Err(VaultError::CommandFailed("entry key cannot be empty".into()));
    }

    // Determine the value from one of three sources.
    let entry_value = if let Some(v) = value {
        // Source 1: Inline value on the command line.
        output::warning("Value provided on command line; it may appear in shell history.");
        Zeroizing::new(v.to_string())
    } else if !io::stdin().is_terminal() {
        // Source 2: Piped input (stdin is not a terminal).
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        Zeroizing::new(buf.trim_end().to_string())
    } else {
        // Source 3: Interactive secure prompt (default).
        let v = dialoguer::Password::new()
            .with_prompt(format!("Enter value for {key}"))
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))?;
        Zeroizing::new(v)
    };

    let (project_dir, settings) = resolve_settings(cli)?;
    let vault = open_vault(&project_dir, &settings)?;

    let existed = vault.read(key).is_some();
    vault.write(&UnsecureEntry::new(key, entry_value.as_str()))?;
    vault.persist()?;

    let total = vault.read_all().len();
    let file = settings.vault_path(&project_dir);
    if existed {
        output::success(&format!(
            "Entry '{key}' updated in {} ({total} total)",
            file.display()
        ));
    } else {
        output::success(&format!(
            "Entry '{key}' added to {} ({total} total)",
            file.display()
        ));
    }

    Ok(())
}

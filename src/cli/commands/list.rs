//! `lockbox list`: display all entries in a table.

use crate::cli::output;
use crate::cli::{open_vault, resolve_settings, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (project_dir, settings) = resolve_settings(cli)?;
    let vault = open_vault(&project_dir, &settings)?;

    let mut entries = vault.read_all();
    entries.sort_by(|a, b| a.key().cmp(b.key()));

    output::info(&format!(
        "{} ({}): {} entr{}",
        settings.vault_path(&project_dir).display(),
        settings.format,
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" }
    ));

    output::print_entries_table(&entries);

    Ok(())
}

//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::SecureEntry;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of entries (Key, Created, Ciphertext size).
///
/// Entries are shown in the order given; callers sort them.
pub fn print_entries_table(entries: &[SecureEntry]) {
    if entries.is_empty() {
        info("No entries in this vault yet.");
        tip("Run `lockbox set <KEY>` to add your first entry.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Key", "Created", "Ciphertext"]);

    for entry in entries {
        table.add_row(vec![
            entry.key().to_string(),
            entry.created_at().format("%Y-%m-%d %H:%M:%S").to_string(),
            format!("{} bytes", entry.cipher_hex().len() / 2),
        ]);
    }

    println!("{table}");
}

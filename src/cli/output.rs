//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// One row of the entry listing.
pub struct EntryRow {
    pub group: String,
    pub title: String,
    pub user_name: String,
}

/// Print a table of entries (Group, Title, User name).
pub fn print_entries_table(rows: &[EntryRow]) {
    if rows.is_empty() {
        info("No entries in this vault yet.");
        tip("Run `passvault add <FILE> <TITLE>` to add your first entry.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Group", "Title", "User name"]);

    for row in rows {
        table.add_row(vec![
            row.group.clone(),
            row.title.clone(),
            row.user_name.clone(),
        ]);
    }

    println!("{table}");
}

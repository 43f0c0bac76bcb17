//! `passvault list` — list entries without touching access stamps.

use crate::cli::{output, prompt_passphrase};
use crate::errors::Result;
use crate::model::{Document, RecordType};

pub fn execute(file: &str) -> Result<()> {
    let passphrase = prompt_passphrase()?;
    let doc = Document::load(file, &passphrase)?;

    // Silent reads keep a list operation from marking the vault as
    // accessed.
    let rows: Vec<output::EntryRow> = doc
        .entries()
        .iter()
        .map(|entry| output::EntryRow {
            group: entry
                .peek_text(RecordType::Group)
                .ok()
                .flatten()
                .unwrap_or_default(),
            title: entry
                .peek_text(RecordType::Title)
                .ok()
                .flatten()
                .unwrap_or_default(),
            user_name: entry
                .peek_text(RecordType::UserName)
                .ok()
                .flatten()
                .unwrap_or_default(),
        })
        .collect();

    output::print_entries_table(&rows);
    Ok(())
}

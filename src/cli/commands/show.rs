//! `passvault show` — print one entry's fields.

use console::style;

use crate::cli::{output, prompt_passphrase};
use crate::errors::{Result, VaultError};
use crate::model::{Document, FieldKind, RecordType};

pub fn execute(file: &str, title: &str, show_password: bool) -> Result<()> {
    let passphrase = prompt_passphrase()?;
    let doc = Document::load(file, &passphrase)?;

    let index = doc
        .find_entry(title)
        .ok_or_else(|| VaultError::EntryNotFound(title.to_string()))?;
    let entry = match doc.entry(index) {
        Some(entry) => entry,
        None => return Err(VaultError::EntryNotFound(title.to_string())),
    };

    for record in entry.records() {
        let rtype = record.record_type();
        let Some(caption) = rtype.caption() else {
            continue;
        };

        let value = match rtype.kind() {
            FieldKind::Text => {
                if rtype == RecordType::Password && !show_password {
                    "********".to_string()
                } else {
                    record.text().unwrap_or_default()
                }
            }
            FieldKind::Time => record
                .time()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            FieldKind::Uuid => record
                .uuid()
                .map(|u| u.to_string())
                .unwrap_or_default(),
            _ => format!("({} bytes)", record.raw_bytes().len()),
        };

        println!("{} {}", style(format!("{caption}:")).bold(), value);
    }

    if !show_password {
        output::tip("Use --show-password to print the password.");
    }
    Ok(())
}

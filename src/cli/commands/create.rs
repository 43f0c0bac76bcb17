//! `passvault create` — create a new empty vault file.

use std::path::Path;

use crate::cli::{output, prompt_new_passphrase};
use crate::errors::{Result, VaultError};
use crate::model::Document;

pub fn execute(file: &str) -> Result<()> {
    let path = Path::new(file);
    if path.exists() {
        return Err(VaultError::CommandFailed(format!(
            "'{file}' already exists"
        )));
    }

    let passphrase = prompt_new_passphrase()?;
    let mut doc = Document::new(&passphrase);
    doc.save(path)?;

    output::success(&format!("Created vault '{file}'"));
    output::tip("Add entries with `passvault add`.");
    Ok(())
}

//! `passvault add` — add an entry to an existing vault.

use crate::cli::{output, prompt_passphrase};
use crate::errors::{Result, VaultError};
use crate::model::{Document, Entry, GroupPath};

pub fn execute(file: &str, title: &str, group: Option<&str>, user: Option<&str>) -> Result<()> {
    let passphrase = prompt_passphrase()?;
    let mut doc = Document::load(file, &passphrase)?;

    let entry = match group {
        Some(group) => Entry::with_group_and_title(GroupPath::from(group), title),
        None => Entry::with_title(title),
    };
    let index = doc.add_entry(entry)?;

    let entry_password = dialoguer::Password::new()
        .with_prompt(format!("Password for '{title}'"))
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;

    {
        let mut entry = match doc.entry_mut(index) {
            Some(entry) => entry,
            None => return Err(VaultError::EntryNotFound(title.to_string())),
        };
        entry.set_password(&entry_password)?;
        if let Some(user) = user {
            entry.set_user_name(user)?;
        }
    }

    doc.save(file)?;
    output::success(&format!("Added entry '{title}' to '{file}'"));
    Ok(())
}

//! CLI module — Clap argument parser, output helpers, and command
//! implementations.

pub mod commands;
pub mod output;

use clap::Parser;
use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};

/// PassVault CLI: Password Safe vault reader/writer.
#[derive(Parser)]
#[command(
    name = "passvault",
    about = "Encrypted password vault (Password Safe V3 format)",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new empty vault file
    Create {
        /// Path for the new vault (e.g. secrets.psafe3)
        file: String,
    },

    /// List all entries in a vault
    List {
        /// Path to the vault file
        file: String,
    },

    /// Show a single entry
    Show {
        /// Path to the vault file
        file: String,
        /// Entry title
        title: String,
        /// Print the password instead of masking it
        #[arg(long)]
        show_password: bool,
    },

    /// Add an entry to a vault
    Add {
        /// Path to the vault file
        file: String,
        /// Entry title
        title: String,
        /// Optional group path (dot-separated)
        #[arg(short, long)]
        group: Option<String>,
        /// Optional user name
        #[arg(short, long)]
        user: Option<String>,
    },
}

/// Get the vault passphrase, from `PASSVAULT_PASSPHRASE` (CI/scripts)
/// or an interactive prompt.
///
/// Returns `Zeroizing<String>` so the passphrase is wiped from memory
/// on drop.
pub fn prompt_passphrase() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var("PASSVAULT_PASSPHRASE") {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault passphrase")
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new passphrase with confirmation (used during `create`).
pub fn prompt_new_passphrase() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var("PASSVAULT_PASSPHRASE") {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Choose vault passphrase")
        .with_confirmation("Confirm vault passphrase", "Passphrases do not match, try again")
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

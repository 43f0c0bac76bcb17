use thiserror::Error;

/// All errors that can occur in PassVault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Open/seal errors ---
    #[error("Authentication failed — wrong passphrase or key")]
    Authentication,

    #[error("Integrity check failed — vault data may be tampered or corrupted")]
    Integrity,

    #[error("Invalid vault format: {0}")]
    Format(String),

    // --- Mutation errors ---
    #[error("Vault is read-only")]
    ReadOnly,

    #[error("No passphrase set — vault was opened with a raw key")]
    PassphraseNotSet,

    // --- Policy errors ---
    #[error("Policy error: {0}")]
    Policy(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Entry '{0}' not found")]
    EntryNotFound(String),
}

/// Convenience type alias for PassVault results.
pub type Result<T> = std::result::Result<T, VaultError>;

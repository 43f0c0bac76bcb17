//! On-disk vault format: field framing and the cryptographic envelope.
//!
//! `framing` is pure byte plumbing (type-length-value fields aligned to
//! the cipher block); `envelope` composes the crypto layer around it to
//! turn a byte stream into decrypted field sections and back.

pub mod envelope;
pub mod framing;

pub use envelope::{open, seal, verify_passphrase, Credential, DecryptedVault};
pub use framing::RawField;

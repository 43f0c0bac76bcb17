//! Cryptographic building blocks for the vault envelope.
//!
//! Three primitives are composed by the envelope codec:
//! - `kdf`: iterated-SHA-256 passphrase stretching (the work factor is
//!   stored in the vault preamble, not hard-coded).
//! - `engine`: the Twofish block cipher in unchained (key wrap) and
//!   CBC (bulk stream) modes.
//! - `keys`: the random per-save session keys (data + authentication)
//!   and their wrapped on-disk form.

pub mod engine;
pub mod kdf;
pub mod keys;

pub use engine::BlockCipher;
pub use kdf::{generate_salt, stretch_passphrase, verification_hash};
pub use keys::SessionKeys;

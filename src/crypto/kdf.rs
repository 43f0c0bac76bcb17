//! Passphrase stretching via iterated SHA-256.
//!
//! The stretched key is the hash of `passphrase || salt`, re-hashed
//! `iterations` more times.  The vault stores the salt, the iteration
//! count, and SHA-256 of the stretched key so a candidate passphrase can
//! be checked without touching the encrypted payload.  The iteration
//! count is persisted per vault so newer vaults can raise the work
//! factor without breaking older ones.

use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the stretched key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Length of the stretched-key verification hash (SHA-256 = 32 bytes).
pub const HASH_LEN: usize = 32;

/// Default iteration count for new vaults.
pub const DEFAULT_ITERATIONS: u32 = 2048;

/// Lowest iteration count ever written; vaults asking for less are
/// raised to this on save.
pub const MIN_ITERATIONS: u32 = 2048;

/// Stretch a passphrase into a 32-byte key.
///
/// Same passphrase + salt + iterations always produces the same key.
pub fn stretch_passphrase(
    passphrase: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Zeroizing<[u8; KEY_LEN]> {
    let mut hasher = Sha256::new();
    hasher.update(passphrase);
    hasher.update(salt);
    let mut digest = hasher.finalize();

    for _ in 0..iterations {
        digest = Sha256::digest(digest);
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(digest.as_slice());
    key
}

/// Hash of the stretched key stored in the vault preamble for
/// passphrase verification.
pub fn verification_hash(stretched: &[u8; KEY_LEN]) -> [u8; HASH_LEN] {
    Sha256::digest(stretched).into()
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

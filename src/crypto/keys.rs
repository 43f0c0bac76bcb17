//! Session keys: the data-encryption key and the authentication key.
//!
//! Both are 32 random bytes generated fresh on every save and persisted
//! wrapped under the stretched passphrase key (two unchained cipher
//! blocks each).  Changing the passphrase therefore only re-wraps these
//! keys — the bulk ciphertext is untouched until the next save.

use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use super::engine::BlockCipher;
use crate::errors::Result;

/// Length of each session key in bytes.
pub const SESSION_KEY_LEN: usize = 32;

/// Length of the combined raw key accepted by key-based open/save.
pub const COMBINED_KEY_LEN: usize = 2 * SESSION_KEY_LEN;

/// The two decrypted session keys held while a vault is open.
///
/// Wiped from memory on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SessionKeys {
    data: [u8; SESSION_KEY_LEN],
    auth: [u8; SESSION_KEY_LEN],
}

impl SessionKeys {
    /// Generate a fresh random key pair.
    pub fn generate() -> Self {
        let mut keys = Self {
            data: [0u8; SESSION_KEY_LEN],
            auth: [0u8; SESSION_KEY_LEN],
        };
        let mut rng = rand::rng();
        rng.fill_bytes(&mut keys.data);
        rng.fill_bytes(&mut keys.auth);
        keys
    }

    /// Split a caller-supplied 64-byte combined key (data || auth).
    pub fn from_combined(combined: &[u8; COMBINED_KEY_LEN]) -> Self {
        let mut keys = Self {
            data: [0u8; SESSION_KEY_LEN],
            auth: [0u8; SESSION_KEY_LEN],
        };
        keys.data.copy_from_slice(&combined[..SESSION_KEY_LEN]);
        keys.auth.copy_from_slice(&combined[SESSION_KEY_LEN..]);
        keys
    }

    /// The combined 64-byte form (data || auth), for alternate
    /// front-ends that store the raw key instead of a passphrase.
    pub fn combined(&self) -> Zeroizing<[u8; COMBINED_KEY_LEN]> {
        let mut out = Zeroizing::new([0u8; COMBINED_KEY_LEN]);
        out[..SESSION_KEY_LEN].copy_from_slice(&self.data);
        out[SESSION_KEY_LEN..].copy_from_slice(&self.auth);
        out
    }

    /// The bulk-encryption key.
    pub fn data_key(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.data
    }

    /// The integrity-tag key.
    pub fn auth_key(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.auth
    }

    /// Wrap both keys under the stretched key for persistence.
    ///
    /// Returns the encrypted data key and encrypted auth key, each two
    /// unchained cipher blocks.
    pub fn wrap(
        &self,
        stretched: &[u8; SESSION_KEY_LEN],
    ) -> Result<([u8; SESSION_KEY_LEN], [u8; SESSION_KEY_LEN])> {
        let cipher = BlockCipher::new(stretched)?;
        let mut wrapped_data = self.data;
        let mut wrapped_auth = self.auth;
        cipher.encrypt_unchained(&mut wrapped_data)?;
        cipher.encrypt_unchained(&mut wrapped_auth)?;
        Ok((wrapped_data, wrapped_auth))
    }

    /// Unwrap a persisted key pair using the stretched key.
    pub fn unwrap(
        wrapped_data: &[u8; SESSION_KEY_LEN],
        wrapped_auth: &[u8; SESSION_KEY_LEN],
        stretched: &[u8; SESSION_KEY_LEN],
    ) -> Result<Self> {
        let cipher = BlockCipher::new(stretched)?;
        let mut keys = Self {
            data: *wrapped_data,
            auth: *wrapped_auth,
        };
        cipher.decrypt_unchained(&mut keys.data)?;
        cipher.decrypt_unchained(&mut keys.auth)?;
        Ok(keys)
    }
}

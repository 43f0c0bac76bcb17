//! Twofish block cipher in the two modes the vault format needs.
//!
//! - **Unchained**: each 16-byte block encrypted independently.  Used
//!   only to wrap/unwrap the two 32-byte session keys under the
//!   stretched key (two blocks each).
//! - **CBC with explicit IV**: used for the bulk field stream.
//!
//! The engine carries no padding policy — the field framing codec is
//! responsible for block alignment of everything passed in here.

use twofish::cipher::generic_array::GenericArray;
use twofish::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use twofish::Twofish;

use crate::errors::{Result, VaultError};

/// Cipher block size in bytes (Twofish is a 128-bit block cipher).
pub const BLOCK_LEN: usize = 16;

/// Length of the CBC initialization vector (one block).
pub const IV_LEN: usize = BLOCK_LEN;

/// A keyed Twofish instance.
pub struct BlockCipher {
    cipher: Twofish,
}

impl BlockCipher {
    /// Build a cipher from a 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self> {
        let cipher = Twofish::new_from_slice(key)
            .map_err(|_| VaultError::Format("invalid cipher key length".into()))?;
        Ok(Self { cipher })
    }

    /// Encrypt `buf` in place, one independent block at a time.
    pub fn encrypt_unchained(&self, buf: &mut [u8]) -> Result<()> {
        Self::check_aligned(buf)?;
        for chunk in buf.chunks_exact_mut(BLOCK_LEN) {
            let block = GenericArray::from_mut_slice(chunk);
            self.cipher.encrypt_block(block);
        }
        Ok(())
    }

    /// Decrypt `buf` in place, one independent block at a time.
    pub fn decrypt_unchained(&self, buf: &mut [u8]) -> Result<()> {
        Self::check_aligned(buf)?;
        for chunk in buf.chunks_exact_mut(BLOCK_LEN) {
            let block = GenericArray::from_mut_slice(chunk);
            self.cipher.decrypt_block(block);
        }
        Ok(())
    }

    /// CBC-encrypt `buf` in place under the given IV.
    pub fn cbc_encrypt(&self, iv: &[u8; IV_LEN], buf: &mut [u8]) -> Result<()> {
        Self::check_aligned(buf)?;
        let mut chain = *iv;
        for chunk in buf.chunks_exact_mut(BLOCK_LEN) {
            for (b, c) in chunk.iter_mut().zip(chain.iter()) {
                *b ^= c;
            }
            let block = GenericArray::from_mut_slice(chunk);
            self.cipher.encrypt_block(block);
            chain.copy_from_slice(chunk);
        }
        Ok(())
    }

    /// CBC-decrypt `buf` in place under the given IV.
    pub fn cbc_decrypt(&self, iv: &[u8; IV_LEN], buf: &mut [u8]) -> Result<()> {
        Self::check_aligned(buf)?;
        let mut chain = *iv;
        for chunk in buf.chunks_exact_mut(BLOCK_LEN) {
            let mut next_chain = [0u8; BLOCK_LEN];
            next_chain.copy_from_slice(chunk);
            let block = GenericArray::from_mut_slice(chunk);
            self.cipher.decrypt_block(block);
            for (b, c) in chunk.iter_mut().zip(chain.iter()) {
                *b ^= c;
            }
            chain = next_chain;
        }
        Ok(())
    }

    fn check_aligned(buf: &[u8]) -> Result<()> {
        if buf.len() % BLOCK_LEN != 0 {
            return Err(VaultError::Format(format!(
                "cipher input length {} is not a multiple of the block size",
                buf.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchained_roundtrip() {
        let cipher = BlockCipher::new(&[0x42u8; 32]).unwrap();
        let original = *b"0123456789abcdef0123456789abcdef";
        let mut buf = original;

        cipher.encrypt_unchained(&mut buf).unwrap();
        assert_ne!(buf, original);
        // Identical plaintext blocks encrypt to identical ciphertext blocks.
        assert_eq!(buf[..16], buf[16..]);

        cipher.decrypt_unchained(&mut buf).unwrap();
        assert_eq!(buf, original);
    }

    #[test]
    fn cbc_roundtrip() {
        let cipher = BlockCipher::new(&[0x42u8; 32]).unwrap();
        let iv = [0x07u8; 16];
        let original = *b"0123456789abcdef0123456789abcdef";
        let mut buf = original;

        cipher.cbc_encrypt(&iv, &mut buf).unwrap();
        assert_ne!(buf, original);
        // Chaining makes identical plaintext blocks differ.
        assert_ne!(buf[..16], buf[16..]);

        cipher.cbc_decrypt(&iv, &mut buf).unwrap();
        assert_eq!(buf, original);
    }

    #[test]
    fn unaligned_input_rejected() {
        let cipher = BlockCipher::new(&[0u8; 32]).unwrap();
        let mut buf = [0u8; 15];
        assert!(cipher.encrypt_unchained(&mut buf).is_err());
        assert!(cipher.cbc_decrypt(&[0u8; 16], &mut buf).is_err());
    }
}

//! The cryptographic envelope around the field stream.
//!
//! A vault file has this layout:
//!
//! ```text
//! [PWS3: 4 bytes][salt: 32][iterations: 4 LE][H(P'): 32]
//! [wrapped data key: 32][wrapped auth key: 32][IV: 16]
//! [Twofish-CBC field stream][PWS3-EOFPWS3-EOF: 16][HMAC-SHA256: 32]
//! ```
//!
//! - **H(P')**: SHA-256 of the stretched passphrase key; checked before
//!   anything is decrypted, so a wrong passphrase is distinguishable
//!   from a corrupt file.
//! - **Wrapped keys**: the data key and the auth key, each encrypted
//!   unchained under the stretched key.
//! - **End marker**: written as a literal, unencrypted block.
//! - **HMAC**: keyed with the auth key, computed over the concatenation
//!   of every decrypted field *value* in stream order — framing bytes
//!   and padding are excluded.
//!
//! `open` either yields a fully decrypted, authenticated field set or a
//! classified error; there is no partial result.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::framing::{self, FieldReader, RawField};
use crate::crypto::engine::{BlockCipher, IV_LEN};
use crate::crypto::kdf::{self, HASH_LEN, SALT_LEN};
use crate::crypto::keys::{SessionKeys, COMBINED_KEY_LEN, SESSION_KEY_LEN};
use crate::errors::{Result, VaultError};

/// Magic tag at the start of every vault.
const MAGIC: &[u8; 4] = b"PWS3";

/// Literal block separating the ciphertext from the trailing tag.
const END_MARKER: &[u8; 16] = b"PWS3-EOFPWS3-EOF";

/// Length of the trailing HMAC-SHA256 tag.
const TAG_LEN: usize = 32;

/// Fixed preamble: magic + salt + iterations + key hash + two wrapped
/// keys + IV.
const PREAMBLE_LEN: usize = 4 + SALT_LEN + 4 + HASH_LEN + 2 * SESSION_KEY_LEN + IV_LEN;

/// Smallest possible vault: preamble, end marker, tag (no fields).
const MIN_LEN: usize = PREAMBLE_LEN + END_MARKER.len() + TAG_LEN;

/// How a vault is unlocked.
pub enum Credential<'a> {
    /// A passphrase, subject to stretching and verification.
    Passphrase(&'a [u8]),
    /// A previously obtained raw session-key pair (data || auth),
    /// bypassing stretching.  Used by alternate front-ends.
    RawKey(&'a [u8; COMBINED_KEY_LEN]),
}

/// Everything recovered from a successfully opened vault.
pub struct DecryptedVault {
    /// Header fields, in stream order, sentinel excluded.
    pub headers: Vec<RawField>,
    /// One record group per entry, sentinels excluded.
    pub entries: Vec<Vec<RawField>>,
    /// The unwrapped session keys.
    pub keys: SessionKeys,
    /// The stretch iteration count stored in the preamble.
    pub iterations: u32,
}

/// Decrypt and authenticate a whole vault image.
pub fn open(bytes: &[u8], credential: Credential<'_>) -> Result<DecryptedVault> {
    if bytes.len() < MIN_LEN {
        return Err(VaultError::Format("file too small to be a vault".into()));
    }
    if &bytes[0..4] != MAGIC {
        return Err(VaultError::Format("missing PWS3 magic tag".into()));
    }

    let mut pos = 4;
    let salt = &bytes[pos..pos + SALT_LEN];
    pos += SALT_LEN;
    let iterations = u32::from_le_bytes([
        bytes[pos],
        bytes[pos + 1],
        bytes[pos + 2],
        bytes[pos + 3],
    ]);
    pos += 4;
    let key_hash = &bytes[pos..pos + HASH_LEN];
    pos += HASH_LEN;
    let mut wrapped_data = [0u8; SESSION_KEY_LEN];
    wrapped_data.copy_from_slice(&bytes[pos..pos + SESSION_KEY_LEN]);
    pos += SESSION_KEY_LEN;
    let mut wrapped_auth = [0u8; SESSION_KEY_LEN];
    wrapped_auth.copy_from_slice(&bytes[pos..pos + SESSION_KEY_LEN]);
    pos += SESSION_KEY_LEN;
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&bytes[pos..pos + IV_LEN]);
    pos += IV_LEN;

    let marker_at = bytes.len() - TAG_LEN - END_MARKER.len();
    if &bytes[marker_at..marker_at + END_MARKER.len()] != END_MARKER {
        return Err(VaultError::Format("end-of-data marker missing".into()));
    }
    let ciphertext = &bytes[pos..marker_at];
    if ciphertext.len() % framing::BLOCK_LEN != 0 {
        return Err(VaultError::Format(
            "encrypted payload is not block-aligned".into(),
        ));
    }
    let stored_tag = &bytes[bytes.len() - TAG_LEN..];

    // Derive or accept the session keys.  The stretched-key hash check
    // happens before any decryption, in constant time.
    let keys = match credential {
        Credential::Passphrase(passphrase) => {
            let stretched = kdf::stretch_passphrase(passphrase, salt, iterations);
            let computed = kdf::verification_hash(&stretched);
            if !bool::from(computed.ct_eq(key_hash)) {
                return Err(VaultError::Authentication);
            }
            SessionKeys::unwrap(&wrapped_data, &wrapped_auth, &stretched)?
        }
        Credential::RawKey(combined) => SessionKeys::from_combined(combined),
    };

    let mut plaintext = Zeroizing::new(ciphertext.to_vec());
    BlockCipher::new(keys.data_key())?.cbc_decrypt(&iv, &mut plaintext)?;

    // Split the flat field stream into the header section and one
    // record group per entry.
    let mut reader = FieldReader::new(&plaintext);
    let mut headers = Vec::new();
    let mut mac = new_mac(keys.auth_key())?;

    loop {
        let field = reader
            .next_field()?
            .ok_or_else(|| VaultError::Format("header section not terminated".into()))?;
        mac.update(&field.data);
        if field.is_end() {
            break;
        }
        headers.push(field);
    }

    let mut entries: Vec<Vec<RawField>> = Vec::new();
    let mut current: Vec<RawField> = Vec::new();
    while let Some(field) = reader.next_field()? {
        mac.update(&field.data);
        if field.is_end() {
            entries.push(std::mem::take(&mut current));
        } else {
            current.push(field);
        }
    }
    if !current.is_empty() {
        entries.push(current);
    }

    // The tag covers every field value just hashed; a mismatch here is
    // tampering or corruption, not a wrong passphrase.
    mac.verify_slice(stored_tag)
        .map_err(|_| VaultError::Integrity)?;

    Ok(DecryptedVault {
        headers,
        entries,
        keys,
        iterations,
    })
}

/// Encrypt the given field sections into a complete vault image.
///
/// A fresh salt and IV are generated on every call; session keys are
/// generated fresh too unless the caller pins them (`save_with_key`).
/// Returns the image together with the session keys actually used.
pub fn seal(
    headers: &[RawField],
    entries: &[Vec<RawField>],
    passphrase: &[u8],
    iterations: u32,
    keys: Option<SessionKeys>,
) -> Result<(Vec<u8>, SessionKeys)> {
    let iterations = iterations.max(kdf::MIN_ITERATIONS);
    let salt = kdf::generate_salt();
    let stretched = kdf::stretch_passphrase(passphrase, &salt, iterations);
    let key_hash = kdf::verification_hash(&stretched);

    let keys = keys.unwrap_or_else(SessionKeys::generate);
    let (wrapped_data, wrapped_auth) = keys.wrap(&stretched)?;

    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    // Frame all fields and accumulate the tag over their values.
    let mut plaintext = Zeroizing::new(Vec::new());
    let mut mac = new_mac(keys.auth_key())?;
    for field in headers {
        framing::write_field(&mut plaintext, field.code, &field.data);
        mac.update(&field.data);
    }
    framing::write_end(&mut plaintext);
    for records in entries {
        for field in records {
            framing::write_field(&mut plaintext, field.code, &field.data);
            mac.update(&field.data);
        }
        framing::write_end(&mut plaintext);
    }
    let tag = mac.finalize().into_bytes();

    BlockCipher::new(keys.data_key())?.cbc_encrypt(&iv, &mut plaintext)?;

    let mut out = Vec::with_capacity(PREAMBLE_LEN + plaintext.len() + END_MARKER.len() + TAG_LEN);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&iterations.to_le_bytes());
    out.extend_from_slice(&key_hash);
    out.extend_from_slice(&wrapped_data);
    out.extend_from_slice(&wrapped_auth);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&plaintext);
    out.extend_from_slice(END_MARKER);
    out.extend_from_slice(tag.as_slice());

    Ok((out, keys))
}

/// Check a candidate passphrase against a vault image without
/// decrypting anything.
pub fn verify_passphrase(bytes: &[u8], passphrase: &[u8]) -> Result<bool> {
    if bytes.len() < MIN_LEN || &bytes[0..4] != MAGIC {
        return Err(VaultError::Format("missing PWS3 magic tag".into()));
    }
    let salt = &bytes[4..4 + SALT_LEN];
    let iterations = u32::from_le_bytes([bytes[36], bytes[37], bytes[38], bytes[39]]);
    let key_hash = &bytes[40..40 + HASH_LEN];

    let stretched = kdf::stretch_passphrase(passphrase, salt, iterations);
    let computed = kdf::verification_hash(&stretched);
    Ok(bool::from(computed.ct_eq(key_hash)))
}

fn new_mac(auth_key: &[u8]) -> Result<Hmac<Sha256>> {
    Hmac::<Sha256>::new_from_slice(auth_key)
        .map_err(|_| VaultError::Format("invalid authentication key length".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sections() -> (Vec<RawField>, Vec<Vec<RawField>>) {
        let headers = vec![
            RawField::new(0x00, vec![0x0D, 0x03]),
            RawField::new(0x09, b"My vault".to_vec()),
        ];
        let entries = vec![
            vec![
                RawField::new(0x03, b"Test".to_vec()),
                RawField::new(0x06, b"Secret!".to_vec()),
            ],
            vec![RawField::new(0x03, b"Other".to_vec())],
        ];
        (headers, entries)
    }

    #[test]
    fn seal_open_roundtrip() {
        let (headers, entries) = sample_sections();
        let (bytes, _) = seal(&headers, &entries, b"Password", 2048, None).unwrap();

        let vault = open(&bytes, Credential::Passphrase(b"Password")).unwrap();
        assert_eq!(vault.headers, headers);
        assert_eq!(vault.entries, entries);
        assert_eq!(vault.iterations, 2048);
    }

    #[test]
    fn wrong_passphrase_is_authentication_error() {
        let (headers, entries) = sample_sections();
        let (bytes, _) = seal(&headers, &entries, b"Password", 2048, None).unwrap();

        assert!(matches!(
            open(&bytes, Credential::Passphrase(b"WrongPassword")),
            Err(VaultError::Authentication)
        ));
    }

    #[test]
    fn raw_key_bypasses_stretching() {
        let (headers, entries) = sample_sections();
        let (bytes, keys) = seal(&headers, &entries, b"Password", 2048, None).unwrap();

        let combined = keys.combined();
        let vault = open(&bytes, Credential::RawKey(&combined)).unwrap();
        assert_eq!(vault.headers, headers);
    }

    #[test]
    fn bad_magic_is_format_error() {
        let (headers, entries) = sample_sections();
        let (mut bytes, _) = seal(&headers, &entries, b"Password", 2048, None).unwrap();
        bytes[0] = b'X';

        assert!(matches!(
            open(&bytes, Credential::Passphrase(b"Password")),
            Err(VaultError::Format(_))
        ));
    }

    #[test]
    fn ciphertext_bitflip_is_integrity_error() {
        let (headers, entries) = sample_sections();
        let (mut bytes, _) = seal(&headers, &entries, b"Password", 2048, None).unwrap();

        // Flip one bit inside the encrypted payload.
        let target = PREAMBLE_LEN + 16;
        bytes[target] ^= 0x01;

        match open(&bytes, Credential::Passphrase(b"Password")) {
            Err(VaultError::Integrity) | Err(VaultError::Format(_)) => {}
            other => panic!("expected integrity failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn tag_bitflip_is_integrity_error() {
        let (headers, entries) = sample_sections();
        let (mut bytes, _) = seal(&headers, &entries, b"Password", 2048, None).unwrap();

        let last = bytes.len() - 1;
        bytes[last] ^= 0x80;
        assert!(matches!(
            open(&bytes, Credential::Passphrase(b"Password")),
            Err(VaultError::Integrity)
        ));
    }

    #[test]
    fn key_hash_bitflip_is_authentication_error() {
        let (headers, entries) = sample_sections();
        let (mut bytes, _) = seal(&headers, &entries, b"Password", 2048, None).unwrap();

        // Corrupt the stored stretched-key hash (starts at offset 40).
        bytes[40] ^= 0x01;
        assert!(matches!(
            open(&bytes, Credential::Passphrase(b"Password")),
            Err(VaultError::Authentication)
        ));
    }

    #[test]
    fn verify_passphrase_has_no_side_effects() {
        let (headers, entries) = sample_sections();
        let (bytes, _) = seal(&headers, &entries, b"Password", 2048, None).unwrap();

        assert!(verify_passphrase(&bytes, b"Password").unwrap());
        assert!(!verify_passphrase(&bytes, b"Password2").unwrap());
    }
}

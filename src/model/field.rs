//! Raw field bytes and their typed interpretations.
//!
//! The same bytes are re-read on demand as text, a timestamp, a UUID,
//! or an opaque blob depending on the declared kind of the field's
//! type code.  A kind mismatch is a format error — never a coercion.
//!
//! Times are 32-bit little-endian Unix seconds on disk; 64-bit values
//! are accepted on read for interoperability.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::errors::{Result, VaultError};

/// What a field's bytes mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Time,
    Uuid,
    Binary,
    /// Two-byte format version (headers only).
    Version,
    /// Unrecognized type code; conversion is always attempted.
    Unknown,
}

impl FieldKind {
    /// Whether a typed accessor of kind `wanted` may touch a field of
    /// this kind.
    pub(crate) fn allows(self, wanted: FieldKind) -> bool {
        self == wanted || self == FieldKind::Unknown
    }
}

pub(crate) fn bytes_to_text(data: &[u8]) -> Result<String> {
    String::from_utf8(data.to_vec())
        .map_err(|_| VaultError::Format("field value is not valid UTF-8".into()))
}

pub(crate) fn text_to_bytes(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

pub(crate) fn bytes_to_time(data: &[u8]) -> Result<DateTime<Utc>> {
    let seconds = match data.len() {
        4 => u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as i64,
        8 => i64::from_le_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ]),
        n => {
            return Err(VaultError::Format(format!(
                "time field has {n} bytes, expected 4 or 8"
            )))
        }
    };
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| VaultError::Format("time field out of range".into()))
}

pub(crate) fn time_to_bytes(time: DateTime<Utc>) -> Result<Vec<u8>> {
    let seconds: u32 = time
        .timestamp()
        .try_into()
        .map_err(|_| VaultError::Format("time not representable in 32 bits".into()))?;
    Ok(seconds.to_le_bytes().to_vec())
}

pub(crate) fn bytes_to_uuid(data: &[u8]) -> Result<Uuid> {
    Uuid::from_slice(data).map_err(|_| {
        VaultError::Format(format!("uuid field has {} bytes, expected 16", data.len()))
    })
}

pub(crate) fn uuid_to_bytes(uuid: Uuid) -> Vec<u8> {
    uuid.as_bytes().to_vec()
}

pub(crate) fn bytes_to_version(data: &[u8]) -> Result<u16> {
    if data.len() < 2 {
        return Err(VaultError::Format("version field too short".into()));
    }
    Ok(u16::from_le_bytes([data[0], data[1]]))
}

pub(crate) fn version_to_bytes(version: u16) -> Vec<u8> {
    version.to_le_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_roundtrip() {
        let time = Utc.with_ymd_and_hms(2016, 1, 11, 7, 35, 1).unwrap();
        let bytes = time_to_bytes(time).unwrap();
        assert_eq!(bytes.len(), 4);
        assert_eq!(bytes_to_time(&bytes).unwrap(), time);
    }

    #[test]
    fn time_accepts_eight_bytes() {
        let time = Utc.with_ymd_and_hms(2016, 1, 11, 7, 35, 1).unwrap();
        let bytes = time.timestamp().to_le_bytes().to_vec();
        assert_eq!(bytes_to_time(&bytes).unwrap(), time);
    }

    #[test]
    fn time_rejects_other_lengths() {
        assert!(bytes_to_time(&[1, 2, 3]).is_err());
    }

    #[test]
    fn uuid_roundtrip() {
        let uuid = Uuid::new_v4();
        assert_eq!(bytes_to_uuid(&uuid_to_bytes(uuid)).unwrap(), uuid);
        assert!(bytes_to_uuid(&[0u8; 7]).is_err());
    }

    #[test]
    fn version_little_endian() {
        assert_eq!(bytes_to_version(&[0x0D, 0x03]).unwrap(), 0x030D);
        assert_eq!(version_to_bytes(0x030D), vec![0x0D, 0x03]);
    }

    #[test]
    fn text_rejects_invalid_utf8() {
        assert!(bytes_to_text(&[0xFF, 0xFE]).is_err());
        assert_eq!(bytes_to_text(b"Test").unwrap(), "Test");
    }
}

//! Type-length-value field framing inside the decrypted stream.
//!
//! Every field is laid out as:
//!
//! ```text
//! [length: 4 bytes LE][type: 1 byte][value: length bytes][padding]
//! ```
//!
//! padded with random bytes to the next 16-byte cipher-block boundary.
//! A field whose `5 + length` already lands on a boundary gets no
//! padding; a zero-length value still occupies one full block.  Padding
//! is discarded on decode and regenerated on encode, so it never
//! round-trips.
//!
//! Type `0xFF` is the section sentinel: it ends the header section and
//! each entry's record group.  Unknown type codes are not rejected —
//! they carry their raw bytes through load and save unchanged so newer
//! field types survive a rewrite by an older reader.

use rand::RngCore;
use zeroize::Zeroize;

use crate::errors::{Result, VaultError};

/// Framing block size — matches the cipher block.
pub const BLOCK_LEN: usize = 16;

/// Sentinel type code ending the header section and each entry.
pub const END_TYPE: u8 = 0xFF;

/// A single framed field: the raw type code and its value bytes.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct RawField {
    pub code: u8,
    pub data: Vec<u8>,
}

impl RawField {
    pub fn new(code: u8, data: Vec<u8>) -> Self {
        Self { code, data }
    }

    pub fn is_end(&self) -> bool {
        self.code == END_TYPE
    }
}

impl std::fmt::Debug for RawField {
    // Values stay out of debug output; many of them are secrets.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawField")
            .field("code", &self.code)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Sequential reader over a decrypted, block-aligned field stream.
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Read the next field, or `None` at the end of the stream.
    pub fn next_field(&mut self) -> Result<Option<RawField>> {
        if self.pos == self.buf.len() {
            return Ok(None);
        }
        if self.buf.len() - self.pos < BLOCK_LEN {
            return Err(VaultError::Format("truncated field block".into()));
        }

        let header = &self.buf[self.pos..];
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let code = header[4];

        // The field spans whole blocks: 5 header bytes + value, padded up.
        let span = (5 + length as u64).div_ceil(BLOCK_LEN as u64) * BLOCK_LEN as u64;
        if span > (self.buf.len() - self.pos) as u64 {
            return Err(VaultError::Format(format!(
                "field of {length} bytes exceeds remaining stream"
            )));
        }
        let span = span as usize;

        let start = self.pos + 5;
        let data = self.buf[start..start + length].to_vec();
        self.pos += span;
        Ok(Some(RawField::new(code, data)))
    }
}

/// Append one framed field to `out`, padding to the block boundary
/// with random bytes.
pub fn write_field(out: &mut Vec<u8>, code: u8, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.push(code);
    out.extend_from_slice(data);

    let used = (5 + data.len()) % BLOCK_LEN;
    if used != 0 {
        let mut padding = [0u8; BLOCK_LEN];
        rand::rng().fill_bytes(&mut padding[..BLOCK_LEN - used]);
        out.extend_from_slice(&padding[..BLOCK_LEN - used]);
    }
}

/// Append the section sentinel (an empty 0xFF field).
pub fn write_end(out: &mut Vec<u8>) {
    write_field(out, END_TYPE, &[]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(buf: &[u8]) -> Vec<RawField> {
        let mut reader = FieldReader::new(buf);
        let mut fields = Vec::new();
        while let Some(field) = reader.next_field().unwrap() {
            fields.push(field);
        }
        fields
    }

    #[test]
    fn roundtrip_preserves_values_not_padding() {
        let mut buf = Vec::new();
        write_field(&mut buf, 0x03, b"Title");
        write_field(&mut buf, 0x06, b"");
        write_end(&mut buf);

        let fields = read_all(&buf);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].code, 0x03);
        assert_eq!(fields[0].data, b"Title");
        assert_eq!(fields[1].data, b"");
        assert!(fields[2].is_end());
    }

    #[test]
    fn block_counts() {
        // 11 value bytes fill a block exactly (5 + 11 = 16): no padding.
        let mut buf = Vec::new();
        write_field(&mut buf, 0x01, &[0xAA; 11]);
        assert_eq!(buf.len(), 16);

        // One byte more rolls into a second block.
        let mut buf = Vec::new();
        write_field(&mut buf, 0x01, &[0xAA; 12]);
        assert_eq!(buf.len(), 32);

        // Empty value still occupies one block.
        let mut buf = Vec::new();
        write_field(&mut buf, 0x01, &[]);
        assert_eq!(buf.len(), 16);

        // 27 bytes: 5 + 27 = 32, two exact blocks.
        let mut buf = Vec::new();
        write_field(&mut buf, 0x01, &[0xAA; 27]);
        assert_eq!(buf.len(), 32);
    }

    #[test]
    fn unknown_types_pass_through() {
        let mut buf = Vec::new();
        write_field(&mut buf, 0xE7, &[1, 2, 3, 4, 5]);
        let fields = read_all(&buf);
        assert_eq!(fields[0].code, 0xE7);
        assert_eq!(fields[0].data, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn truncated_stream_fails() {
        let mut buf = Vec::new();
        write_field(&mut buf, 0x03, &[0xAA; 40]);

        // Chop off the last block: the declared length no longer fits.
        buf.truncate(32);
        let mut reader = FieldReader::new(&buf);
        assert!(matches!(
            reader.next_field(),
            Err(VaultError::Format(_))
        ));

        // A partial block is also an error.
        let mut reader = FieldReader::new(&[0u8; 7]);
        assert!(reader.next_field().is_err());
    }
}

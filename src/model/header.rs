//! Document-level header fields.
//!
//! At most one header exists per type; assigning a type that is
//! already present overwrites it.  Unknown type codes are preserved
//! verbatim so newer vaults survive a load/save cycle.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::field::{self, FieldKind};
use crate::errors::{Result, VaultError};

/// The fixed enumeration of known header types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderType {
    Version,
    Uuid,
    NonDefaultPreferences,
    TreeDisplayStatus,
    TimestampOfLastSave,
    WhoPerformedLastSave,
    WhatPerformedLastSave,
    LastSavedByUser,
    LastSavedOnHost,
    DatabaseName,
    DatabaseDescription,
    DatabaseFilters,
    RecentlyUsedEntries,
    NamedPasswordPolicies,
    EmptyGroups,
    /// A type code this library does not recognize; round-trips as-is.
    Other(u8),
}

impl HeaderType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => Self::Version,
            0x01 => Self::Uuid,
            0x02 => Self::NonDefaultPreferences,
            0x03 => Self::TreeDisplayStatus,
            0x04 => Self::TimestampOfLastSave,
            0x05 => Self::WhoPerformedLastSave,
            0x06 => Self::WhatPerformedLastSave,
            0x07 => Self::LastSavedByUser,
            0x08 => Self::LastSavedOnHost,
            0x09 => Self::DatabaseName,
            0x0A => Self::DatabaseDescription,
            0x0B => Self::DatabaseFilters,
            0x0F => Self::RecentlyUsedEntries,
            0x10 => Self::NamedPasswordPolicies,
            0x11 => Self::EmptyGroups,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Version => 0x00,
            Self::Uuid => 0x01,
            Self::NonDefaultPreferences => 0x02,
            Self::TreeDisplayStatus => 0x03,
            Self::TimestampOfLastSave => 0x04,
            Self::WhoPerformedLastSave => 0x05,
            Self::WhatPerformedLastSave => 0x06,
            Self::LastSavedByUser => 0x07,
            Self::LastSavedOnHost => 0x08,
            Self::DatabaseName => 0x09,
            Self::DatabaseDescription => 0x0A,
            Self::DatabaseFilters => 0x0B,
            Self::RecentlyUsedEntries => 0x0F,
            Self::NamedPasswordPolicies => 0x10,
            Self::EmptyGroups => 0x11,
            Self::Other(code) => code,
        }
    }

    /// Data kind of this header type.
    pub fn kind(self) -> FieldKind {
        match self {
            Self::Version => FieldKind::Version,
            Self::Uuid => FieldKind::Uuid,
            Self::TimestampOfLastSave => FieldKind::Time,
            Self::NonDefaultPreferences
            | Self::TreeDisplayStatus
            | Self::WhoPerformedLastSave
            | Self::WhatPerformedLastSave
            | Self::LastSavedByUser
            | Self::LastSavedOnHost
            | Self::DatabaseName
            | Self::DatabaseDescription
            | Self::DatabaseFilters
            | Self::RecentlyUsedEntries
            | Self::NamedPasswordPolicies
            | Self::EmptyGroups => FieldKind::Text,
            Self::Other(_) => FieldKind::Unknown,
        }
    }
}

/// A single header field: type plus raw bytes.
#[derive(Clone)]
pub struct Header {
    htype: HeaderType,
    data: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Header")
            .field("type", &self.htype)
            .field("len", &self.data.len())
            .finish()
    }
}

impl Header {
    /// New empty header of the given type.
    pub fn new(htype: HeaderType) -> Self {
        Self {
            htype,
            data: Zeroizing::new(Vec::new()),
        }
    }

    /// New text header; fails if the type is not text-kinded.
    pub fn with_text(htype: HeaderType, text: &str) -> Result<Self> {
        let mut header = Self::new(htype);
        header.put_text(text)?;
        Ok(header)
    }

    /// New UUID header; fails if the type is not uuid-kinded.
    pub fn with_uuid(htype: HeaderType, uuid: Uuid) -> Result<Self> {
        let mut header = Self::new(htype);
        header.put_uuid(uuid)?;
        Ok(header)
    }

    /// New time header; fails if the type is not time-kinded.
    pub fn with_time(htype: HeaderType, time: DateTime<Utc>) -> Result<Self> {
        let mut header = Self::new(htype);
        header.put_time(time)?;
        Ok(header)
    }

    /// New version header; fails if the type is not version-kinded.
    pub fn with_version(htype: HeaderType, version: u16) -> Result<Self> {
        let mut header = Self::new(htype);
        header.put_version(version)?;
        Ok(header)
    }

    pub(crate) fn from_raw(code: u8, data: Vec<u8>) -> Self {
        Self {
            htype: HeaderType::from_code(code),
            data: Zeroizing::new(data),
        }
    }

    pub fn header_type(&self) -> HeaderType {
        self.htype
    }

    pub fn kind(&self) -> FieldKind {
        self.htype.kind()
    }

    /// Raw bytes, no interpretation.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn text(&self) -> Result<String> {
        self.check_kind(FieldKind::Text)?;
        field::bytes_to_text(&self.data)
    }

    pub fn time(&self) -> Result<DateTime<Utc>> {
        self.check_kind(FieldKind::Time)?;
        field::bytes_to_time(&self.data)
    }

    pub fn uuid(&self) -> Result<Uuid> {
        self.check_kind(FieldKind::Uuid)?;
        field::bytes_to_uuid(&self.data)
    }

    pub fn version(&self) -> Result<u16> {
        self.check_kind(FieldKind::Version)?;
        field::bytes_to_version(&self.data)
    }

    pub(crate) fn put_text(&mut self, text: &str) -> Result<()> {
        self.check_kind(FieldKind::Text)?;
        self.data = Zeroizing::new(field::text_to_bytes(text));
        Ok(())
    }

    pub(crate) fn put_time(&mut self, time: DateTime<Utc>) -> Result<()> {
        self.check_kind(FieldKind::Time)?;
        self.data = Zeroizing::new(field::time_to_bytes(time)?);
        Ok(())
    }

    pub(crate) fn put_uuid(&mut self, uuid: Uuid) -> Result<()> {
        self.check_kind(FieldKind::Uuid)?;
        self.data = Zeroizing::new(field::uuid_to_bytes(uuid));
        Ok(())
    }

    pub(crate) fn put_version(&mut self, version: u16) -> Result<()> {
        self.check_kind(FieldKind::Version)?;
        self.data = Zeroizing::new(field::version_to_bytes(version));
        Ok(())
    }

    fn check_kind(&self, wanted: FieldKind) -> Result<()> {
        if !self.kind().allows(wanted) {
            return Err(VaultError::Format(format!(
                "header {:?} holds {:?} data, not {:?}",
                self.htype,
                self.kind(),
                wanted
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes_roundtrip() {
        for code in 0u8..=0xFE {
            assert_eq!(HeaderType::from_code(code).code(), code);
        }
    }

    #[test]
    fn text_header() {
        let header = Header::with_text(HeaderType::DatabaseName, "Test").unwrap();
        assert_eq!(header.text().unwrap(), "Test");
    }

    #[test]
    fn kind_mismatch_is_format_error() {
        assert!(matches!(
            Header::with_uuid(HeaderType::DatabaseName, Uuid::new_v4()),
            Err(VaultError::Format(_))
        ));
        let header = Header::with_text(HeaderType::DatabaseName, "Test").unwrap();
        assert!(header.time().is_err());
    }

    #[test]
    fn unknown_type_allows_any_interpretation() {
        let header = Header::from_raw(0xE0, b"free-form".to_vec());
        assert_eq!(header.header_type(), HeaderType::Other(0xE0));
        assert_eq!(header.text().unwrap(), "free-form");
    }
}

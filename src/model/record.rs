//! Entry-level record fields.
//!
//! Each record is one typed value inside an entry.  The type table is
//! closed at compile time (unknown codes degrade to `Other` and pass
//! through untouched), and each type declares the data kind its bytes
//! must be interpreted as.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::field::{self, FieldKind};
use crate::errors::{Result, VaultError};

/// Default autotype template used when a new autotype record is created.
pub const DEFAULT_AUTOTYPE: &str = r"\u\t\p\n";

/// The fixed enumeration of known record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Uuid,
    Group,
    Title,
    UserName,
    Notes,
    Password,
    CreationTime,
    PasswordModificationTime,
    LastAccessTime,
    PasswordExpiryTime,
    LastModificationTime,
    Url,
    Autotype,
    PasswordHistory,
    PasswordPolicy,
    RunCommand,
    EmailAddress,
    OwnSymbolsForPassword,
    PasswordPolicyName,
    TwoFactorKey,
    CreditCardNumber,
    CreditCardExpiration,
    CreditCardVerificationValue,
    CreditCardPin,
    QRCode,
    /// A type code this library does not recognize; round-trips as-is.
    Other(u8),
}

impl RecordType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => Self::Uuid,
            0x02 => Self::Group,
            0x03 => Self::Title,
            0x04 => Self::UserName,
            0x05 => Self::Notes,
            0x06 => Self::Password,
            0x07 => Self::CreationTime,
            0x08 => Self::PasswordModificationTime,
            0x09 => Self::LastAccessTime,
            0x0A => Self::PasswordExpiryTime,
            0x0C => Self::LastModificationTime,
            0x0D => Self::Url,
            0x0E => Self::Autotype,
            0x0F => Self::PasswordHistory,
            0x10 => Self::PasswordPolicy,
            0x12 => Self::RunCommand,
            0x14 => Self::EmailAddress,
            0x17 => Self::OwnSymbolsForPassword,
            0x19 => Self::PasswordPolicyName,
            0xF0 => Self::TwoFactorKey,
            0xF1 => Self::CreditCardNumber,
            0xF2 => Self::CreditCardExpiration,
            0xF3 => Self::CreditCardVerificationValue,
            0xF4 => Self::CreditCardPin,
            0xF5 => Self::QRCode,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Uuid => 0x01,
            Self::Group => 0x02,
            Self::Title => 0x03,
            Self::UserName => 0x04,
            Self::Notes => 0x05,
            Self::Password => 0x06,
            Self::CreationTime => 0x07,
            Self::PasswordModificationTime => 0x08,
            Self::LastAccessTime => 0x09,
            Self::PasswordExpiryTime => 0x0A,
            Self::LastModificationTime => 0x0C,
            Self::Url => 0x0D,
            Self::Autotype => 0x0E,
            Self::PasswordHistory => 0x0F,
            Self::PasswordPolicy => 0x10,
            Self::RunCommand => 0x12,
            Self::EmailAddress => 0x14,
            Self::OwnSymbolsForPassword => 0x17,
            Self::PasswordPolicyName => 0x19,
            Self::TwoFactorKey => 0xF0,
            Self::CreditCardNumber => 0xF1,
            Self::CreditCardExpiration => 0xF2,
            Self::CreditCardVerificationValue => 0xF3,
            Self::CreditCardPin => 0xF4,
            Self::QRCode => 0xF5,
            Self::Other(code) => code,
        }
    }

    /// Data kind of this record type.
    pub fn kind(self) -> FieldKind {
        match self {
            Self::Uuid => FieldKind::Uuid,
            Self::CreationTime
            | Self::PasswordModificationTime
            | Self::LastAccessTime
            | Self::PasswordExpiryTime
            | Self::LastModificationTime => FieldKind::Time,
            Self::TwoFactorKey => FieldKind::Binary,
            Self::Other(_) => FieldKind::Unknown,
            _ => FieldKind::Text,
        }
    }

    /// Whether this type is one of the tracking timestamps, which are
    /// themselves exempt from access/modification stamping.
    pub(crate) fn is_time_stamp(self) -> bool {
        matches!(
            self,
            Self::CreationTime
                | Self::PasswordModificationTime
                | Self::LastAccessTime
                | Self::PasswordExpiryTime
                | Self::LastModificationTime
        )
    }

    /// Human-readable caption, or `None` for unrecognized types.
    pub fn caption(self) -> Option<&'static str> {
        match self {
            Self::Uuid => Some("UUID"),
            Self::Group => Some("Group"),
            Self::Title => Some("Title"),
            Self::UserName => Some("User name"),
            Self::Notes => Some("Notes"),
            Self::Password => Some("Password"),
            Self::Url => Some("URL"),
            Self::Autotype => Some("Auto-type"),
            Self::PasswordHistory => Some("Password history"),
            Self::PasswordPolicy => Some("Password policy"),
            Self::RunCommand => Some("Run command"),
            Self::EmailAddress => Some("Email address"),
            Self::OwnSymbolsForPassword => Some("Own symbols for password"),
            Self::PasswordPolicyName => Some("Password policy name"),
            Self::CreditCardNumber => Some("Card number"),
            Self::CreditCardExpiration => Some("Card expiration"),
            Self::CreditCardVerificationValue => Some("Card verification code"),
            Self::CreditCardPin => Some("Card pin"),
            Self::QRCode => Some("QR code"),
            Self::CreationTime => Some("Creation time"),
            Self::PasswordModificationTime => Some("Password modification time"),
            Self::LastAccessTime => Some("Last access time"),
            Self::PasswordExpiryTime => Some("Password expiry time"),
            Self::LastModificationTime => Some("Last modification time"),
            Self::TwoFactorKey => Some("Two-factor key"),
            Self::Other(_) => None,
        }
    }
}

/// A single record field: type plus raw bytes.
#[derive(Clone)]
pub struct Record {
    rtype: RecordType,
    data: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for Record {
    // Values stay out of debug output; many of them are secrets.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("type", &self.rtype)
            .field("len", &self.data.len())
            .finish()
    }
}

impl Record {
    /// New empty record.  An autotype record starts with the default
    /// template instead of empty text.
    pub fn new(rtype: RecordType) -> Self {
        let data = if rtype == RecordType::Autotype {
            field::text_to_bytes(DEFAULT_AUTOTYPE)
        } else {
            Vec::new()
        };
        Self {
            rtype,
            data: Zeroizing::new(data),
        }
    }

    /// New text record; fails if the type is not text-kinded.
    pub fn with_text(rtype: RecordType, text: &str) -> Result<Self> {
        let mut record = Self::new(rtype);
        record.check_kind(FieldKind::Text)?;
        record.data = Zeroizing::new(field::text_to_bytes(text));
        Ok(record)
    }

    /// New UUID record; fails if the type is not uuid-kinded.
    pub fn with_uuid(rtype: RecordType, uuid: Uuid) -> Result<Self> {
        let mut record = Self::new(rtype);
        record.check_kind(FieldKind::Uuid)?;
        record.data = Zeroizing::new(field::uuid_to_bytes(uuid));
        Ok(record)
    }

    /// New time record; fails if the type is not time-kinded.
    pub fn with_time(rtype: RecordType, time: DateTime<Utc>) -> Result<Self> {
        let mut record = Self::new(rtype);
        record.check_kind(FieldKind::Time)?;
        record.data = Zeroizing::new(field::time_to_bytes(time)?);
        Ok(record)
    }

    pub(crate) fn from_raw(code: u8, data: Vec<u8>) -> Self {
        Self {
            rtype: RecordType::from_code(code),
            data: Zeroizing::new(data),
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.rtype
    }

    pub fn kind(&self) -> FieldKind {
        self.rtype.kind()
    }

    /// Raw bytes without tracking — the programmatic-inspection path.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Untracked typed reads, usable on detached records.
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

    // Raw byte writes are the escape hatch and skip the kind check.
    pub(crate) fn put_bytes(&mut self, bytes: &[u8]) {
        self.data = Zeroizing::new(bytes.to_vec());
    }

    pub(crate) fn check_kind(&self, wanted: FieldKind) -> Result<()> {
        if !self.kind().allows(wanted) {
            return Err(VaultError::Format(format!(
                "record {:?} holds {:?} data, not {:?}",
                self.rtype,
                self.kind(),
                wanted
            )));
        }
        Ok(())
    }
}

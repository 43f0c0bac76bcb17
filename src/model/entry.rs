//! Entries and the tracked view used to read and write their records.
//!
//! A detached `Entry` is plain data.  Once it lives inside a document,
//! all value access goes through `EntryMut`, which borrows the
//! document's tracking state alongside the entry storage — that is
//! where read-only enforcement, dirty marking, access/modification
//! stamping, and password-history capture happen.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::autotype::{self, AutotypeContext, AutotypeToken};
use super::document::Tracking;
use super::field::FieldKind;
use super::grouppath::GroupPath;
use super::history::PasswordHistory;
use super::policy::PasswordPolicy;
use super::record::{Record, RecordType};
use crate::errors::{Result, VaultError};
use crate::format::framing::RawField;

/// One credential entry: an ordered set of records.
///
/// Every new entry starts with a UUID, a title, and a password record;
/// loaded entries keep exactly the records found in the stream.
#[derive(Debug, Clone)]
pub struct Entry {
    pub(crate) records: Vec<Record>,
}

impl Entry {
    /// New entry with a random UUID, empty title, and empty password.
    pub fn new() -> Self {
        Self::with_title("")
    }

    /// New entry with the given title.
    pub fn with_title(title: &str) -> Self {
        let mut records = vec![Record::new(RecordType::Uuid)];
        records[0].put_bytes(Uuid::new_v4().as_bytes());
        records.push(Record::new(RecordType::Title));
        records.push(Record::new(RecordType::Password));
        let mut entry = Self { records };
        if !title.is_empty() {
            if let Some(record) = entry.record_mut(RecordType::Title) {
                let _ = record.put_text(title);
            }
        }
        entry
    }

    /// New entry with the given group and title.
    pub fn with_group_and_title(group: GroupPath, title: &str) -> Self {
        let mut entry = Self::with_title(title);
        if let Ok(record) = Record::with_text(RecordType::Group, group.as_str()) {
            entry.records.insert(1, record);
        }
        entry
    }

    pub(crate) fn from_raw_fields(fields: Vec<RawField>) -> Self {
        let records = fields
            .into_iter()
            .map(|field| Record::from_raw(field.code, field.data.clone()))
            .collect();
        Self { records }
    }

    pub(crate) fn to_raw_fields(&self) -> Vec<RawField> {
        self.records
            .iter()
            .map(|record| RawField::new(record.record_type().code(), record.raw_bytes().to_vec()))
            .collect()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn record(&self, rtype: RecordType) -> Option<&Record> {
        self.records.iter().find(|r| r.record_type() == rtype)
    }

    pub fn contains(&self, rtype: RecordType) -> bool {
        self.record(rtype).is_some()
    }

    pub(crate) fn record_mut(&mut self, rtype: RecordType) -> Option<&mut Record> {
        self.records.iter_mut().find(|r| r.record_type() == rtype)
    }

    // --- Silent reads -----------------------------------------------------
    //
    // These bypass tracking entirely; use them for programmatic
    // inspection that must not stamp access times.

    pub fn peek_text(&self, rtype: RecordType) -> Result<Option<String>> {
        self.record(rtype).map(|r| r.text()).transpose()
    }

    pub fn peek_time(&self, rtype: RecordType) -> Result<Option<DateTime<Utc>>> {
        self.record(rtype).map(|r| r.time()).transpose()
    }

    pub fn peek_uuid(&self, rtype: RecordType) -> Result<Option<Uuid>> {
        self.record(rtype).map(|r| r.uuid()).transpose()
    }

    pub fn peek_bytes(&self, rtype: RecordType) -> Option<&[u8]> {
        self.record(rtype).map(Record::raw_bytes)
    }

    /// Title without tracking; lookup helper for collections.
    pub(crate) fn title_matches(&self, title: &str) -> bool {
        match self.peek_text(RecordType::Title) {
            Ok(Some(t)) => t == title,
            _ => title.is_empty(),
        }
    }

    pub(crate) fn group_matches(&self, group: &str) -> bool {
        match self.peek_text(RecordType::Group) {
            Ok(Some(g)) => g == group,
            _ => group.is_empty(),
        }
    }
}

impl Default for Entry {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracked, mutable view of one entry inside a document.
pub struct EntryMut<'a> {
    pub(crate) entry: &'a mut Entry,
    pub(crate) tracking: &'a mut Tracking,
}

impl EntryMut<'_> {
    // --- Generic typed access --------------------------------------------

    /// Read a text record.  `None` when the record is absent.
    pub fn text(&mut self, rtype: RecordType) -> Result<Option<String>> {
        let value = self.entry.peek_text(rtype)?;
        self.mark_accessed(rtype);
        Ok(value)
    }

    /// Read a time record.
    pub fn time(&mut self, rtype: RecordType) -> Result<Option<DateTime<Utc>>> {
        let value = self.entry.peek_time(rtype)?;
        self.mark_accessed(rtype);
        Ok(value)
    }

    /// Read a UUID record.
    pub fn uuid_of(&mut self, rtype: RecordType) -> Result<Option<Uuid>> {
        let value = self.entry.peek_uuid(rtype)?;
        self.mark_accessed(rtype);
        Ok(value)
    }

    /// Read raw bytes of any record, tracking the access.
    pub fn bytes(&mut self, rtype: RecordType) -> Option<Vec<u8>> {
        let value = self.entry.peek_bytes(rtype).map(|b| b.to_vec());
        self.mark_accessed(rtype);
        value
    }

    /// Write a text record, creating it when absent.
    ///
    /// A password write first captures the previous password into the
    /// history record, when one exists and history is enabled.
    pub fn set_text(&mut self, rtype: RecordType, value: &str) -> Result<()> {
        self.guard()?;
        if rtype == RecordType::Password {
            self.capture_password_history()?;
        }
        self.write_text(rtype, value)
    }

    /// Write a time record, creating it when absent.
    pub fn set_time(&mut self, rtype: RecordType, value: DateTime<Utc>) -> Result<()> {
        self.guard()?;
        match self.entry.record_mut(rtype) {
            Some(record) => {
                let previous = record.time().ok();
                if previous == Some(value) {
                    return Ok(());
                }
                record.put_time(value)?;
            }
            None => {
                let record = Record::with_time(rtype, value)?;
                self.entry.records.push(record);
            }
        }
        self.mark_changed(rtype);
        Ok(())
    }

    /// Write a UUID record, creating it when absent.
    pub fn set_uuid(&mut self, rtype: RecordType, value: Uuid) -> Result<()> {
        self.guard()?;
        match self.entry.record_mut(rtype) {
            Some(record) => {
                if record.raw_bytes() == value.as_bytes() {
                    return Ok(());
                }
                record.put_uuid(value)?;
            }
            None => {
                let record = Record::with_uuid(rtype, value)?;
                self.entry.records.push(record);
            }
        }
        self.mark_changed(rtype);
        Ok(())
    }

    /// Write raw bytes to any record, creating it when absent.  Raw
    /// writes skip the kind check.
    pub fn set_bytes(&mut self, rtype: RecordType, value: &[u8]) -> Result<()> {
        self.guard()?;
        match self.entry.record_mut(rtype) {
            Some(record) => {
                if record.raw_bytes() == value {
                    return Ok(());
                }
                record.put_bytes(value);
            }
            None => {
                let mut record = Record::new(rtype);
                record.put_bytes(value);
                self.entry.records.push(record);
            }
        }
        self.mark_changed(rtype);
        Ok(())
    }

    /// Add a detached record, replacing any existing record of the
    /// same type.
    pub fn add_record(&mut self, record: Record) -> Result<()> {
        self.guard()?;
        let rtype = record.record_type();
        match self.entry.record_mut(rtype) {
            Some(existing) => *existing = record,
            None => self.entry.records.push(record),
        }
        self.mark_changed(rtype);
        Ok(())
    }

    /// Remove a record.  Returns whether one was present.
    pub fn remove_record(&mut self, rtype: RecordType) -> Result<bool> {
        self.guard()?;
        let before = self.entry.records.len();
        self.entry.records.retain(|r| r.record_type() != rtype);
        let removed = self.entry.records.len() != before;
        if removed {
            self.mark_changed(rtype);
        }
        Ok(removed)
    }

    pub fn contains(&self, rtype: RecordType) -> bool {
        self.entry.contains(rtype)
    }

    pub fn record_count(&self) -> usize {
        self.entry.records.len()
    }

    // --- Convenience accessors -------------------------------------------

    pub fn uuid(&mut self) -> Result<Option<Uuid>> {
        self.uuid_of(RecordType::Uuid)
    }

    pub fn set_entry_uuid(&mut self, value: Uuid) -> Result<()> {
        self.set_uuid(RecordType::Uuid, value)
    }

    pub fn title(&mut self) -> Result<String> {
        Ok(self.text(RecordType::Title)?.unwrap_or_default())
    }

    pub fn set_title(&mut self, value: &str) -> Result<()> {
        self.set_text(RecordType::Title, value)
    }

    pub fn group(&mut self) -> Result<GroupPath> {
        Ok(GroupPath::from(
            self.text(RecordType::Group)?.unwrap_or_default(),
        ))
    }

    pub fn set_group(&mut self, value: &GroupPath) -> Result<()> {
        self.set_text(RecordType::Group, value.as_str())
    }

    pub fn user_name(&mut self) -> Result<String> {
        Ok(self.text(RecordType::UserName)?.unwrap_or_default())
    }

    pub fn set_user_name(&mut self, value: &str) -> Result<()> {
        self.set_text(RecordType::UserName, value)
    }

    pub fn notes(&mut self) -> Result<String> {
        Ok(self.text(RecordType::Notes)?.unwrap_or_default())
    }

    pub fn set_notes(&mut self, value: &str) -> Result<()> {
        self.set_text(RecordType::Notes, value)
    }

    pub fn password(&mut self) -> Result<String> {
        Ok(self.text(RecordType::Password)?.unwrap_or_default())
    }

    pub fn set_password(&mut self, value: &str) -> Result<()> {
        self.set_text(RecordType::Password, value)
    }

    pub fn url(&mut self) -> Result<String> {
        Ok(self.text(RecordType::Url)?.unwrap_or_default())
    }

    pub fn set_url(&mut self, value: &str) -> Result<()> {
        self.set_text(RecordType::Url, value)
    }

    pub fn email(&mut self) -> Result<String> {
        Ok(self.text(RecordType::EmailAddress)?.unwrap_or_default())
    }

    pub fn set_email(&mut self, value: &str) -> Result<()> {
        self.set_text(RecordType::EmailAddress, value)
    }

    pub fn autotype(&mut self) -> Result<Option<String>> {
        self.text(RecordType::Autotype)
    }

    pub fn set_autotype(&mut self, value: &str) -> Result<()> {
        self.set_text(RecordType::Autotype, value)
    }

    pub fn two_factor_key(&mut self) -> Option<Vec<u8>> {
        self.bytes(RecordType::TwoFactorKey)
    }

    pub fn set_two_factor_key(&mut self, value: &[u8]) -> Result<()> {
        self.set_bytes(RecordType::TwoFactorKey, value)
    }

    pub fn credit_card_number(&mut self) -> Result<String> {
        Ok(self.text(RecordType::CreditCardNumber)?.unwrap_or_default())
    }

    pub fn set_credit_card_number(&mut self, value: &str) -> Result<()> {
        self.set_text(RecordType::CreditCardNumber, value)
    }

    pub fn credit_card_expiration(&mut self) -> Result<String> {
        Ok(self
            .text(RecordType::CreditCardExpiration)?
            .unwrap_or_default())
    }

    pub fn set_credit_card_expiration(&mut self, value: &str) -> Result<()> {
        self.set_text(RecordType::CreditCardExpiration, value)
    }

    pub fn credit_card_verification_value(&mut self) -> Result<String> {
        Ok(self
            .text(RecordType::CreditCardVerificationValue)?
            .unwrap_or_default())
    }

    pub fn set_credit_card_verification_value(&mut self, value: &str) -> Result<()> {
        self.set_text(RecordType::CreditCardVerificationValue, value)
    }

    pub fn credit_card_pin(&mut self) -> Result<String> {
        Ok(self.text(RecordType::CreditCardPin)?.unwrap_or_default())
    }

    pub fn set_credit_card_pin(&mut self, value: &str) -> Result<()> {
        self.set_text(RecordType::CreditCardPin, value)
    }

    pub fn qr_code(&mut self) -> Result<String> {
        Ok(self.text(RecordType::QRCode)?.unwrap_or_default())
    }

    pub fn set_qr_code(&mut self, value: &str) -> Result<()> {
        self.set_text(RecordType::QRCode, value)
    }

    pub fn creation_time(&mut self) -> Result<Option<DateTime<Utc>>> {
        self.time(RecordType::CreationTime)
    }

    pub fn set_creation_time(&mut self, value: DateTime<Utc>) -> Result<()> {
        self.set_time(RecordType::CreationTime, value)
    }

    pub fn last_access_time(&mut self) -> Result<Option<DateTime<Utc>>> {
        self.time(RecordType::LastAccessTime)
    }

    pub fn set_last_access_time(&mut self, value: DateTime<Utc>) -> Result<()> {
        self.set_time(RecordType::LastAccessTime, value)
    }

    pub fn last_modification_time(&mut self) -> Result<Option<DateTime<Utc>>> {
        self.time(RecordType::LastModificationTime)
    }

    pub fn set_last_modification_time(&mut self, value: DateTime<Utc>) -> Result<()> {
        self.set_time(RecordType::LastModificationTime, value)
    }

    pub fn password_modification_time(&mut self) -> Result<Option<DateTime<Utc>>> {
        self.time(RecordType::PasswordModificationTime)
    }

    pub fn set_password_modification_time(&mut self, value: DateTime<Utc>) -> Result<()> {
        self.set_time(RecordType::PasswordModificationTime, value)
    }

    pub fn password_expiry_time(&mut self) -> Result<Option<DateTime<Utc>>> {
        self.time(RecordType::PasswordExpiryTime)
    }

    pub fn set_password_expiry_time(&mut self, value: DateTime<Utc>) -> Result<()> {
        self.set_time(RecordType::PasswordExpiryTime, value)
    }

    // --- Password history -------------------------------------------------

    /// Parsed history view.  Absent or malformed blobs read as a
    /// disabled, empty history.
    pub fn password_history(&mut self) -> Result<PasswordHistory> {
        let text = self.text(RecordType::PasswordHistory)?.unwrap_or_default();
        Ok(PasswordHistory::parse(&text))
    }

    /// Write the history view back to its record.
    pub fn set_password_history(&mut self, history: &PasswordHistory) -> Result<()> {
        self.set_text(RecordType::PasswordHistory, &history.to_text())
    }

    // --- Per-entry password policy ----------------------------------------

    /// The entry's own policy, with symbols from the own-symbols record.
    pub fn password_policy(&mut self) -> Result<Option<PasswordPolicy>> {
        let Some(packed) = self.text(RecordType::PasswordPolicy)? else {
            return Ok(None);
        };
        let chars: Vec<char> = packed.chars().collect();
        let Some(mut policy) = PasswordPolicy::from_packed(&chars) else {
            return Ok(None);
        };
        if let Some(symbols) = self.text(RecordType::OwnSymbolsForPassword)? {
            let symbols: Vec<char> = symbols.chars().collect();
            policy.set_special_symbol_set(&symbols);
        }
        Ok(Some(policy))
    }

    pub fn set_password_policy(&mut self, policy: &PasswordPolicy) -> Result<()> {
        self.set_text(RecordType::PasswordPolicy, &policy.to_packed())?;
        let symbols: String = policy.special_symbol_set().iter().collect();
        self.set_text(RecordType::OwnSymbolsForPassword, &symbols)
    }

    // --- Autotype ----------------------------------------------------------

    /// Expand the entry's autotype template against its field values.
    pub fn autotype_tokens(&mut self) -> Result<Vec<AutotypeToken>> {
        let template = self.autotype()?;
        let tokens = autotype::unexpanded_tokens(template.as_deref());
        let ctx = AutotypeContext {
            user_name: self.user_name()?,
            password: self.password()?,
            title: self.title()?,
            group: self.group()?.to_string(),
            url: self.url()?,
            email: self.email()?,
            notes: self.notes()?,
            credit_card_number: self.credit_card_number()?,
            credit_card_expiration: self.credit_card_expiration()?,
            credit_card_verification_value: self.credit_card_verification_value()?,
            credit_card_pin: self.credit_card_pin()?,
        };
        Ok(autotype::expand_tokens(&tokens, &ctx))
    }

    // --- Tracking plumbing -------------------------------------------------

    fn guard(&self) -> Result<()> {
        if self.tracking.read_only {
            return Err(VaultError::ReadOnly);
        }
        Ok(())
    }

    fn write_text(&mut self, rtype: RecordType, value: &str) -> Result<()> {
        match self.entry.record_mut(rtype) {
            Some(record) => {
                record.check_kind(FieldKind::Text)?;
                if record.raw_bytes() == value.as_bytes() {
                    return Ok(());
                }
                record.put_text(value)?;
            }
            None => {
                let record = Record::with_text(rtype, value)?;
                self.entry.records.push(record);
            }
        }
        self.mark_changed(rtype);
        Ok(())
    }

    /// Append the current password to the history record, when the
    /// entry keeps history and it is enabled.
    fn capture_password_history(&mut self) -> Result<()> {
        if !self.entry.contains(RecordType::PasswordHistory) {
            return Ok(());
        }
        let Some(current) = self
            .entry
            .record(RecordType::Password)
            .and_then(|r| r.text().ok())
        else {
            return Ok(());
        };

        let history_text = self
            .entry
            .peek_text(RecordType::PasswordHistory)?
            .unwrap_or_default();
        let mut history = PasswordHistory::parse(&history_text);
        if !history.enabled() {
            return Ok(());
        }

        let time = self
            .entry
            .record(RecordType::PasswordModificationTime)
            .and_then(|r| r.time().ok())
            .unwrap_or_else(Utc::now);
        history.push(time, &current);
        self.write_text(RecordType::PasswordHistory, &history.to_text())
    }

    fn stamp_time(&mut self, rtype: RecordType) {
        let now = Utc::now();
        match self.entry.record_mut(rtype) {
            Some(record) => {
                let _ = record.put_time(now);
            }
            None => {
                if let Ok(record) = Record::with_time(rtype, now) {
                    self.entry.records.push(record);
                }
            }
        }
    }

    fn mark_changed(&mut self, rtype: RecordType) {
        self.tracking.changed = true;
        if self.tracking.track_modify && !rtype.is_time_stamp() {
            if rtype == RecordType::Password {
                self.stamp_time(RecordType::PasswordModificationTime);
            }
            self.stamp_time(RecordType::LastModificationTime);
        }
    }

    fn mark_accessed(&mut self, rtype: RecordType) {
        // Access stamps are silently dropped on a read-only document;
        // reads must stay side-effect free there.
        if self.tracking.read_only {
            return;
        }
        if self.tracking.track_access && !rtype.is_time_stamp() {
            self.stamp_time(RecordType::LastAccessTime);
            self.tracking.changed = true;
        }
    }
}

//! The document: aggregate root over headers, entries, and the
//! cryptographic state of one vault.
//!
//! All mutation entry points run through a single read-only guard, and
//! every tracked mutation flips the dirty flag.  Saving re-seals the
//! whole aggregate with a fresh salt, IV, and session keys, stamps the
//! last-save headers (unless read-only or modification tracking is
//! off), and clears the dirty flag.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::entry::{Entry, EntryMut};
use super::field;
use super::grouppath::GroupPath;
use super::header::{Header, HeaderType};
use super::policy::{self, NamedPasswordPolicy};
use crate::crypto::kdf::DEFAULT_ITERATIONS;
use crate::crypto::keys::{SessionKeys, COMBINED_KEY_LEN};
use crate::errors::{Result, VaultError};
use crate::format::envelope::{self, Credential};
use crate::format::framing::RawField;

/// Identifier written into the what-performed-last-save header.
const APPLICATION_NAME: &str = concat!("PassVault V", env!("CARGO_PKG_VERSION"));

/// Format version written into new vaults.
const DEFAULT_VERSION: u16 = 0x030D;

/// Shared tracking state borrowed by entry views.
#[derive(Debug, Clone)]
pub(crate) struct Tracking {
    pub changed: bool,
    pub read_only: bool,
    pub track_access: bool,
    pub track_modify: bool,
}

impl Default for Tracking {
    fn default() -> Self {
        Self {
            changed: false,
            read_only: false,
            track_access: true,
            track_modify: true,
        }
    }
}

/// An open vault.
pub struct Document {
    headers: Vec<Header>,
    entries: Vec<Entry>,
    tracking: Tracking,
    passphrase: Option<Zeroizing<Vec<u8>>>,
    keys: SessionKeys,
    iterations: u32,
}

impl Document {
    /// New empty vault protected by `passphrase`.
    pub fn new(passphrase: &str) -> Self {
        let headers = vec![
            Header::from_raw(
                HeaderType::Version.code(),
                field::version_to_bytes(DEFAULT_VERSION),
            ),
            Header::from_raw(HeaderType::Uuid.code(), field::uuid_to_bytes(Uuid::new_v4())),
        ];
        Self {
            headers,
            entries: Vec::new(),
            tracking: Tracking::default(),
            passphrase: Some(Zeroizing::new(passphrase.as_bytes().to_vec())),
            keys: SessionKeys::generate(),
            iterations: DEFAULT_ITERATIONS,
        }
    }

    // --- Loading -----------------------------------------------------------

    /// Open a vault file.  The file is owned, read, and closed here.
    pub fn load(path: impl AsRef<Path>, passphrase: &str) -> Result<Self> {
        let bytes = Zeroizing::new(fs::read(path)?);
        Self::from_bytes(&bytes, Credential::Passphrase(passphrase.as_bytes()))
    }

    /// Open a vault from a caller-owned reader.
    pub fn load_from(reader: &mut impl Read, passphrase: &str) -> Result<Self> {
        let mut bytes = Zeroizing::new(Vec::new());
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes, Credential::Passphrase(passphrase.as_bytes()))
    }

    /// Open a vault with a raw 64-byte session key (data || auth),
    /// bypassing passphrase stretching.  The resulting document cannot
    /// be saved until a passphrase is set.
    pub fn load_with_key(reader: &mut impl Read, key: &[u8; COMBINED_KEY_LEN]) -> Result<Self> {
        let mut bytes = Zeroizing::new(Vec::new());
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes, Credential::RawKey(key))
    }

    fn from_bytes(bytes: &[u8], credential: Credential<'_>) -> Result<Self> {
        let passphrase = match &credential {
            Credential::Passphrase(p) => Some(Zeroizing::new(p.to_vec())),
            Credential::RawKey(_) => None,
        };
        let vault = envelope::open(bytes, credential)?;

        let headers = vault
            .headers
            .iter()
            .map(|f| Header::from_raw(f.code, f.data.clone()))
            .collect();
        let entries = vault
            .entries
            .into_iter()
            .map(Entry::from_raw_fields)
            .collect();

        Ok(Self {
            headers,
            entries,
            tracking: Tracking::default(),
            passphrase,
            keys: vault.keys,
            iterations: vault.iterations,
        })
    }

    // --- Saving ------------------------------------------------------------

    /// Serialize and encrypt the vault to a file.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.seal(None)?;
        fs::write(path, &bytes)?;
        self.tracking.changed = false;
        Ok(())
    }

    /// Serialize and encrypt the vault to a caller-owned writer.
    pub fn save_to(&mut self, writer: &mut impl Write) -> Result<()> {
        let bytes = self.seal(None)?;
        writer.write_all(&bytes)?;
        self.tracking.changed = false;
        Ok(())
    }

    /// Save using a caller-pinned 64-byte session key instead of fresh
    /// random keys.  A passphrase is still required to wrap them.
    pub fn save_to_with_key(
        &mut self,
        writer: &mut impl Write,
        key: &[u8; COMBINED_KEY_LEN],
    ) -> Result<()> {
        let bytes = self.seal(Some(SessionKeys::from_combined(key)))?;
        writer.write_all(&bytes)?;
        self.tracking.changed = false;
        Ok(())
    }

    fn seal(&mut self, pinned_keys: Option<SessionKeys>) -> Result<Vec<u8>> {
        let passphrase = self
            .passphrase
            .clone()
            .ok_or(VaultError::PassphraseNotSet)?;

        if !self.tracking.read_only && self.tracking.track_modify {
            self.stamp_save_headers()?;
        }

        let headers: Vec<RawField> = self
            .headers
            .iter()
            .map(|h| RawField::new(h.header_type().code(), h.raw_bytes().to_vec()))
            .collect();
        let entries: Vec<Vec<RawField>> =
            self.entries.iter().map(Entry::to_raw_fields).collect();

        let (bytes, keys) =
            envelope::seal(&headers, &entries, &passphrase, self.iterations, pinned_keys)?;
        self.keys = keys;
        Ok(bytes)
    }

    fn stamp_save_headers(&mut self) -> Result<()> {
        self.put_header_time(HeaderType::TimestampOfLastSave, Utc::now())?;
        self.put_header_text(HeaderType::LastSavedByUser, &whoami::username())?;
        let host = whoami::fallible::hostname().unwrap_or_default();
        self.put_header_text(HeaderType::LastSavedOnHost, &host)?;
        self.put_header_text(HeaderType::WhatPerformedLastSave, APPLICATION_NAME)?;
        Ok(())
    }

    // --- Passphrase management ---------------------------------------------

    /// Check a candidate against the current passphrase, in constant
    /// time.  No mutation, no tracking side effect.
    pub fn validate_passphrase(&self, candidate: &str) -> bool {
        match &self.passphrase {
            Some(current) => bool::from(current.ct_eq(candidate.as_bytes())),
            None => false,
        }
    }

    /// Replace the passphrase.  Bulk data is untouched; the next save
    /// re-wraps the session keys under the new stretched key.
    pub fn change_passphrase(&mut self, new_passphrase: &str) -> Result<()> {
        self.guard()?;
        self.passphrase = Some(Zeroizing::new(new_passphrase.as_bytes().to_vec()));
        self.tracking.changed = true;
        Ok(())
    }

    /// Replace the passphrase only if `old` validates.  Nothing
    /// changes on a mismatch.
    pub fn try_change_passphrase(&mut self, old: &str, new_passphrase: &str) -> Result<bool> {
        if !self.validate_passphrase(old) {
            return Ok(false);
        }
        self.change_passphrase(new_passphrase)?;
        Ok(true)
    }

    /// Set a passphrase on a document opened with a raw key.
    pub fn set_passphrase(&mut self, passphrase: &str) -> Result<()> {
        self.change_passphrase(passphrase)
    }

    /// The current passphrase bytes, when one is known.
    pub fn passphrase(&self) -> Option<&[u8]> {
        self.passphrase.as_deref().map(Vec::as_slice)
    }

    /// The current 64-byte session key (data || auth), refreshed on
    /// every save.  Alternate front-ends persist this to reopen the
    /// vault without the passphrase.
    pub fn raw_key(&self) -> Zeroizing<[u8; COMBINED_KEY_LEN]> {
        self.keys.combined()
    }

    // --- Tracking state -----------------------------------------------------

    pub fn has_changed(&self) -> bool {
        self.tracking.changed
    }

    pub fn is_read_only(&self) -> bool {
        self.tracking.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.tracking.read_only = read_only;
    }

    pub fn track_access(&self) -> bool {
        self.tracking.track_access
    }

    pub fn set_track_access(&mut self, track: bool) {
        self.tracking.track_access = track;
    }

    pub fn track_modify(&self) -> bool {
        self.tracking.track_modify
    }

    pub fn set_track_modify(&mut self, track: bool) {
        self.tracking.track_modify = track;
    }

    /// Stretch iteration count used on the next save.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn set_iterations(&mut self, iterations: u32) -> Result<()> {
        self.guard()?;
        if self.iterations != iterations {
            self.iterations = iterations;
            self.tracking.changed = true;
        }
        Ok(())
    }

    fn guard(&self) -> Result<()> {
        if self.tracking.read_only {
            return Err(VaultError::ReadOnly);
        }
        Ok(())
    }

    // --- Headers -----------------------------------------------------------

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    pub fn header(&self, htype: HeaderType) -> Option<&Header> {
        self.headers.iter().find(|h| h.header_type() == htype)
    }

    /// Insert or overwrite the header slot for this type.
    pub fn set_header(&mut self, header: Header) -> Result<()> {
        self.guard()?;
        let htype = header.header_type();
        match self.headers.iter_mut().find(|h| h.header_type() == htype) {
            Some(existing) => {
                if existing.raw_bytes() == header.raw_bytes() {
                    return Ok(());
                }
                *existing = header;
            }
            None => self.headers.push(header),
        }
        self.tracking.changed = true;
        Ok(())
    }

    /// Remove the header slot.  Returns whether one was present.
    pub fn remove_header(&mut self, htype: HeaderType) -> Result<bool> {
        self.guard()?;
        let before = self.headers.len();
        self.headers.retain(|h| h.header_type() != htype);
        let removed = self.headers.len() != before;
        if removed {
            self.tracking.changed = true;
        }
        Ok(removed)
    }

    pub fn header_text(&self, htype: HeaderType) -> Result<Option<String>> {
        self.header(htype).map(|h| h.text()).transpose()
    }

    pub fn set_header_text(&mut self, htype: HeaderType, text: &str) -> Result<()> {
        self.guard()?;
        self.put_header_text(htype, text)?;
        Ok(())
    }

    pub fn header_time(&self, htype: HeaderType) -> Result<Option<DateTime<Utc>>> {
        self.header(htype).map(|h| h.time()).transpose()
    }

    pub fn set_header_time(&mut self, htype: HeaderType, time: DateTime<Utc>) -> Result<()> {
        self.guard()?;
        self.put_header_time(htype, time)?;
        Ok(())
    }

    pub fn header_uuid(&self, htype: HeaderType) -> Result<Option<Uuid>> {
        self.header(htype).map(|h| h.uuid()).transpose()
    }

    pub fn set_header_uuid(&mut self, htype: HeaderType, uuid: Uuid) -> Result<()> {
        self.guard()?;
        match self.headers.iter_mut().find(|h| h.header_type() == htype) {
            Some(existing) => {
                if existing.raw_bytes() == uuid.as_bytes() {
                    return Ok(());
                }
                existing.put_uuid(uuid)?;
            }
            None => self.headers.push(Header::with_uuid(htype, uuid)?),
        }
        self.tracking.changed = true;
        Ok(())
    }

    // Internal writes used both by public setters (after the guard)
    // and by save stamping.
    fn put_header_text(&mut self, htype: HeaderType, text: &str) -> Result<()> {
        match self.headers.iter_mut().find(|h| h.header_type() == htype) {
            Some(existing) => {
                if existing.raw_bytes() == text.as_bytes() {
                    return Ok(());
                }
                existing.put_text(text)?;
            }
            None => self.headers.push(Header::with_text(htype, text)?),
        }
        self.tracking.changed = true;
        Ok(())
    }

    fn put_header_time(&mut self, htype: HeaderType, time: DateTime<Utc>) -> Result<()> {
        match self.headers.iter_mut().find(|h| h.header_type() == htype) {
            Some(existing) => existing.put_time(time)?,
            None => self.headers.push(Header::with_time(htype, time)?),
        }
        self.tracking.changed = true;
        Ok(())
    }

    // --- Document conveniences ---------------------------------------------

    /// Database name from the name header.
    pub fn name(&self) -> Option<String> {
        self.header_text(HeaderType::DatabaseName).ok().flatten()
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        self.set_header_text(HeaderType::DatabaseName, name)
    }

    pub fn description(&self) -> Option<String> {
        self.header_text(HeaderType::DatabaseDescription)
            .ok()
            .flatten()
    }

    pub fn set_description(&mut self, description: &str) -> Result<()> {
        self.set_header_text(HeaderType::DatabaseDescription, description)
    }

    pub fn uuid(&self) -> Option<Uuid> {
        self.header_uuid(HeaderType::Uuid).ok().flatten()
    }

    pub fn set_uuid(&mut self, uuid: Uuid) -> Result<()> {
        self.set_header_uuid(HeaderType::Uuid, uuid)
    }

    pub fn version(&self) -> Option<u16> {
        self.header(HeaderType::Version).and_then(|h| h.version().ok())
    }

    pub fn last_save_time(&self) -> Option<DateTime<Utc>> {
        self.header_time(HeaderType::TimestampOfLastSave)
            .ok()
            .flatten()
    }

    pub fn last_save_user(&self) -> Option<String> {
        self.header_text(HeaderType::LastSavedByUser).ok().flatten()
    }

    pub fn last_save_host(&self) -> Option<String> {
        self.header_text(HeaderType::LastSavedOnHost).ok().flatten()
    }

    pub fn last_save_application(&self) -> Option<String> {
        self.header_text(HeaderType::WhatPerformedLastSave)
            .ok()
            .flatten()
    }

    // --- Entries -----------------------------------------------------------

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Tracked view of the entry at `index`.
    pub fn entry_mut(&mut self, index: usize) -> Option<EntryMut<'_>> {
        let entry = self.entries.get_mut(index)?;
        Some(EntryMut {
            entry,
            tracking: &mut self.tracking,
        })
    }

    /// Append an entry.  Returns its index.
    pub fn add_entry(&mut self, entry: Entry) -> Result<usize> {
        self.guard()?;
        self.entries.push(entry);
        self.tracking.changed = true;
        Ok(self.entries.len() - 1)
    }

    /// Remove the entry at `index`.
    pub fn remove_entry(&mut self, index: usize) -> Result<()> {
        self.guard()?;
        if index >= self.entries.len() {
            return Err(VaultError::EntryNotFound(format!("#{index}")));
        }
        self.entries.remove(index);
        self.tracking.changed = true;
        Ok(())
    }

    /// First entry with this title, in collection order.
    pub fn find_entry(&self, title: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.title_matches(title))
    }

    /// First entry matching both group and title.
    pub fn find_entry_in_group(&self, group: &GroupPath, title: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.group_matches(group.as_str()) && e.title_matches(title))
    }

    /// Tracked view of the first entry with this title.
    pub fn entry_by_title_mut(&mut self, title: &str) -> Option<EntryMut<'_>> {
        let index = self.find_entry(title)?;
        self.entry_mut(index)
    }

    /// First entry with this title, created when missing.
    pub fn entry_or_insert(&mut self, title: &str) -> Result<EntryMut<'_>> {
        let index = match self.find_entry(title) {
            Some(index) => index,
            None => self.add_entry(Entry::with_title(title))?,
        };
        // The index is valid by construction.
        self.entry_mut(index).ok_or(VaultError::EntryNotFound(title.to_string()))
    }

    // --- Named password policies -------------------------------------------

    /// Policies parsed from the named-policies header.  Malformed
    /// blobs read as an empty collection.
    pub fn named_password_policies(&self) -> Vec<NamedPasswordPolicy> {
        let text = self
            .header_text(HeaderType::NamedPasswordPolicies)
            .ok()
            .flatten()
            .unwrap_or_default();
        policy::parse_named_policies(&text)
    }

    /// Add one named policy; a duplicate name is a policy error.
    pub fn add_named_password_policy(&mut self, named: NamedPasswordPolicy) -> Result<()> {
        self.guard()?;
        let mut policies = self.named_password_policies();
        if policies.iter().any(|p| p.name() == named.name()) {
            return Err(VaultError::Policy(format!(
                "password policy with the name '{}' already exists",
                named.name()
            )));
        }
        policies.push(named);
        let text = policy::encode_named_policies(&policies)?;
        self.put_header_text(HeaderType::NamedPasswordPolicies, &text)
    }

    /// Replace all named policies at once.  Duplicate names within the
    /// new set are a policy error.
    pub fn set_named_password_policies(&mut self, policies: &[NamedPasswordPolicy]) -> Result<()> {
        self.guard()?;
        for (i, a) in policies.iter().enumerate() {
            if policies[..i].iter().any(|b| b.name() == a.name()) {
                return Err(VaultError::Policy(format!(
                    "password policy with the name '{}' already exists",
                    a.name()
                )));
            }
        }
        let text = policy::encode_named_policies(policies)?;
        self.put_header_text(HeaderType::NamedPasswordPolicies, &text)
    }

    /// Remove a named policy by name.  Returns whether one was present.
    pub fn remove_named_password_policy(&mut self, name: &str) -> Result<bool> {
        self.guard()?;
        let mut policies = self.named_password_policies();
        let before = policies.len();
        policies.retain(|p| p.name() != name);
        if policies.len() == before {
            return Ok(false);
        }
        let text = policy::encode_named_policies(&policies)?;
        self.put_header_text(HeaderType::NamedPasswordPolicies, &text)?;
        Ok(true)
    }

    /// Remove every named policy.
    pub fn clear_named_password_policies(&mut self) -> Result<()> {
        self.guard()?;
        let text = policy::encode_named_policies(&[])?;
        self.put_header_text(HeaderType::NamedPasswordPolicies, &text)
    }
}

impl std::fmt::Debug for Document {
    // Secrets (passphrase, keys, field values) stay out of debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("headers", &self.headers.len())
            .field("entries", &self.entries.len())
            .field("changed", &self.tracking.changed)
            .field("read_only", &self.tracking.read_only)
            .finish()
    }
}

//! Integration tests for the document model: round trips, tracking,
//! read-only enforcement, and passphrase management.

use std::io::Cursor;

use chrono::{TimeZone, Utc};
use passvault::errors::VaultError;
use passvault::model::{Document, Entry, GroupPath, HeaderType, PasswordHistory, RecordType};

/// Helper: save to a buffer and reload with the given passphrase.
fn save_and_reload(doc: &mut Document, passphrase: &str) -> Document {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("save should succeed");
    Document::load_from(&mut Cursor::new(buffer), passphrase).expect("reload should succeed")
}

// ---------------------------------------------------------------------------
// New document round-trip
// ---------------------------------------------------------------------------

#[test]
fn new_document_save_and_load() {
    let mut doc = Document::new("Password");
    doc.add_entry(Entry::with_title("Test")).unwrap();

    let mut reloaded = save_and_reload(&mut doc, "Password");
    assert!(!doc.has_changed());

    assert_eq!(reloaded.entry_count(), 1);
    let mut entry = reloaded.entry_mut(0).unwrap();
    assert_eq!(entry.title().unwrap(), "Test");
}

#[test]
fn new_document_has_version_and_uuid_headers() {
    let doc = Document::new("Password");
    assert_eq!(doc.version(), Some(0x030D));
    assert!(doc.uuid().is_some());
    assert!(!doc.has_changed());
}

#[test]
fn wrong_passphrase_is_authentication_error() {
    let mut doc = Document::new("Password");
    doc.add_entry(Entry::with_title("Test")).unwrap();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();

    let result = Document::load_from(&mut Cursor::new(buffer), "WrongPassword");
    assert!(matches!(result, Err(VaultError::Authentication)));
}

#[test]
fn values_survive_roundtrip_with_tracking_off() {
    let mut doc = Document::new("Password");
    doc.set_track_access(false);
    doc.set_track_modify(false);

    doc.set_name("My vault").unwrap();
    doc.set_header_text(HeaderType::NonDefaultPreferences, "").unwrap();

    let creation = Utc.with_ymd_and_hms(2015, 12, 28, 8, 36, 47).unwrap();
    let index = doc.add_entry(Entry::with_title("A")).unwrap();
    {
        let mut entry = doc.entry_mut(index).unwrap();
        entry.set_password("A123").unwrap();
        entry.set_creation_time(creation).unwrap();
        entry.set_user_name("user-a").unwrap();
    }
    let uuid = doc.entry(index).unwrap().peek_uuid(RecordType::Uuid).unwrap();

    let mut reloaded = save_and_reload(&mut doc, "Password");
    reloaded.set_track_access(false);
    reloaded.set_track_modify(false);

    assert_eq!(reloaded.name().as_deref(), Some("My vault"));
    assert_eq!(
        reloaded.header_text(HeaderType::NonDefaultPreferences).unwrap().as_deref(),
        Some("")
    );
    // Modification tracking was off, so nothing stamped the last-save
    // headers.
    assert!(reloaded.last_save_time().is_none());

    assert_eq!(reloaded.entry_count(), 1);
    let mut entry = reloaded.entry_mut(0).unwrap();
    assert_eq!(entry.uuid().unwrap(), uuid);
    assert_eq!(entry.title().unwrap(), "A");
    assert_eq!(entry.password().unwrap(), "A123");
    assert_eq!(entry.user_name().unwrap(), "user-a");
    assert_eq!(entry.creation_time().unwrap(), Some(creation));
    assert!(!reloaded.has_changed());
}

#[test]
fn save_with_modify_tracking_stamps_last_save_headers() {
    let mut doc = Document::new("Password");
    doc.set_track_access(false);
    doc.add_entry(Entry::with_title("Test")).unwrap();

    let before = Utc::now();
    let reloaded = save_and_reload(&mut doc, "Password");

    let stamped = reloaded.last_save_time().expect("save should be stamped");
    assert!(stamped >= before - chrono::Duration::seconds(1));
    assert!(stamped <= Utc::now());
    assert!(reloaded
        .last_save_application()
        .expect("application should be stamped")
        .starts_with("PassVault"));
    assert!(reloaded.last_save_user().is_some());
    assert!(reloaded.last_save_host().is_some());
}

// ---------------------------------------------------------------------------
// Change tracking
// ---------------------------------------------------------------------------

#[test]
fn tracked_mutations_set_changed() {
    let mut doc = Document::new("Password");
    assert!(!doc.has_changed());

    doc.set_name("Test").unwrap();
    assert!(doc.has_changed());

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    assert!(!doc.has_changed());

    doc.remove_header(HeaderType::DatabaseName).unwrap();
    assert!(doc.has_changed());
}

#[test]
fn setting_same_value_does_not_mark_changed() {
    let mut doc = Document::new("Password");
    doc.set_track_access(false);
    let index = doc.add_entry(Entry::with_title("A")).unwrap();
    doc.entry_mut(index).unwrap().set_password("A123").unwrap();

    let mut doc = save_and_reload(&mut doc, "Password");
    doc.set_track_access(false);
    assert!(!doc.has_changed());

    let mut entry = doc.entry_mut(0).unwrap();
    entry.set_title("A").unwrap();
    entry.set_password("A123").unwrap();
    assert!(!doc.has_changed());

    doc.entry_mut(0).unwrap().set_title("a").unwrap();
    assert!(doc.has_changed());
}

#[test]
fn modify_tracking_stamps_modification_times() {
    let mut doc = Document::new("Password");
    doc.set_track_access(false);
    let index = doc.add_entry(Entry::with_title("B")).unwrap();

    // New entries carry uuid, title, and password records.
    assert_eq!(doc.entry(index).unwrap().record_count(), 3);

    doc.entry_mut(index).unwrap().set_notes("Notes").unwrap();
    let entry = doc.entry(index).unwrap();
    assert!(entry.contains(RecordType::Notes));
    assert!(entry.contains(RecordType::LastModificationTime));
    assert!(!entry.contains(RecordType::PasswordModificationTime));

    doc.entry_mut(index).unwrap().set_password("new").unwrap();
    let entry = doc.entry(index).unwrap();
    assert!(entry.contains(RecordType::PasswordModificationTime));
}

#[test]
fn access_tracking_stamps_last_access_time() {
    let mut doc = Document::new("Password");
    doc.set_track_modify(false);
    let index = doc.add_entry(Entry::with_title("A")).unwrap();
    doc.entry_mut(index).unwrap().set_password("A123").unwrap();

    let mut doc = save_and_reload(&mut doc, "Password");
    doc.set_track_modify(false);
    let records_before = doc.entry(0).unwrap().record_count();

    // Merely reading the password adds a last-access record.
    let _ = doc.entry_mut(0).unwrap().password().unwrap();
    let entry = doc.entry(0).unwrap();
    assert!(entry.contains(RecordType::LastAccessTime));
    assert_eq!(entry.record_count(), records_before + 1);
}

#[test]
fn reads_without_tracking_leave_no_trace() {
    let mut doc = Document::new("Password");
    let index = doc.add_entry(Entry::with_title("A")).unwrap();
    doc.entry_mut(index).unwrap().set_password("A123").unwrap();

    let mut doc = save_and_reload(&mut doc, "Password");
    doc.set_track_access(false);
    doc.set_track_modify(false);

    let _ = doc.entry_mut(0).unwrap().password().unwrap();
    assert!(!doc.entry(0).unwrap().contains(RecordType::LastAccessTime));
    assert!(!doc.has_changed());
}

#[test]
fn silent_reads_never_stamp() {
    let mut doc = Document::new("Password");
    let index = doc.add_entry(Entry::with_title("A")).unwrap();
    doc.entry_mut(index).unwrap().set_password("A123").unwrap();

    let mut doc = save_and_reload(&mut doc, "Password");
    // Access tracking is on, but peeks bypass it.
    let entry = doc.entry(0).unwrap();
    let _ = entry.peek_text(RecordType::Password).unwrap();
    let _ = entry.peek_bytes(RecordType::Password);

    assert!(!doc.entry(0).unwrap().contains(RecordType::LastAccessTime));
    assert!(!doc.has_changed());
}

// ---------------------------------------------------------------------------
// Read-only enforcement
// ---------------------------------------------------------------------------

#[test]
fn read_only_blocks_every_mutation_path() {
    let mut doc = Document::new("Password");
    let index = doc.add_entry(Entry::with_title("Test")).unwrap();
    doc.entry_mut(index).unwrap().set_password("Old").unwrap();
    doc.set_read_only(true);

    assert!(matches!(
        doc.set_name("X"),
        Err(VaultError::ReadOnly)
    ));
    assert!(matches!(
        doc.remove_header(HeaderType::DatabaseName),
        Err(VaultError::ReadOnly)
    ));
    assert!(matches!(
        doc.add_entry(Entry::new()),
        Err(VaultError::ReadOnly)
    ));
    assert!(matches!(doc.remove_entry(0), Err(VaultError::ReadOnly)));
    assert!(matches!(
        doc.entry_mut(0).unwrap().set_password("New"),
        Err(VaultError::ReadOnly)
    ));
    assert!(matches!(
        doc.entry_mut(0).unwrap().remove_record(RecordType::Password),
        Err(VaultError::ReadOnly)
    ));
    assert!(matches!(
        doc.change_passphrase("Password2"),
        Err(VaultError::ReadOnly)
    ));
    assert!(matches!(
        doc.set_uuid(uuid::Uuid::new_v4()),
        Err(VaultError::ReadOnly)
    ));

    // Failed mutations left no trace.
    assert!(!doc.has_changed());
    assert_eq!(doc.entry_mut(0).unwrap().password().unwrap(), "Old");
}

#[test]
fn read_only_save_is_idempotent() {
    let mut doc = Document::new("Password");
    doc.set_track_access(false);
    doc.set_track_modify(false);
    doc.add_entry(Entry::with_title("Test")).unwrap();
    let mut doc = save_and_reload(&mut doc, "Password");

    // Tracking stays at its defaults; read-only alone must prevent
    // stamping.
    doc.set_read_only(true);
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    assert!(!doc.has_changed());

    let reloaded = Document::load_from(&mut Cursor::new(buffer), "Password").unwrap();
    assert!(reloaded.last_save_time().is_none());
    assert!(reloaded.last_save_user().is_none());
}

#[test]
fn read_only_reads_still_work() {
    let mut doc = Document::new("Password");
    let index = doc.add_entry(Entry::with_title("Test")).unwrap();
    doc.entry_mut(index).unwrap().set_password("pw").unwrap();
    doc.set_read_only(true);

    assert_eq!(
        doc.entry(0).unwrap().peek_text(RecordType::Title).unwrap().as_deref(),
        Some("Test")
    );
    assert!(doc.entry_or_insert("Missing").is_err());
}

// ---------------------------------------------------------------------------
// Passphrase management
// ---------------------------------------------------------------------------

#[test]
fn change_passphrase_and_reload() {
    let mut doc = Document::new("Password");
    doc.add_entry(Entry::with_title("Test")).unwrap();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    assert_eq!(doc.passphrase(), Some("Password".as_bytes()));

    doc.change_passphrase("Password2").unwrap();
    assert!(doc.has_changed());
    assert_eq!(doc.passphrase(), Some("Password2".as_bytes()));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    assert!(!doc.has_changed());

    let mut reloaded =
        Document::load_from(&mut Cursor::new(buffer.clone()), "Password2").unwrap();
    assert_eq!(reloaded.entry_mut(0).unwrap().title().unwrap(), "Test");

    assert!(matches!(
        Document::load_from(&mut Cursor::new(buffer), "Password"),
        Err(VaultError::Authentication)
    ));
}

#[test]
fn try_change_passphrase_validates_old() {
    let mut doc = Document::new("Password");
    doc.add_entry(Entry::with_title("Test")).unwrap();
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();

    assert!(!doc.try_change_passphrase("Password1", "Password2").unwrap());
    assert!(!doc.has_changed());
    assert_eq!(doc.passphrase(), Some("Password".as_bytes()));

    assert!(doc.try_change_passphrase("Password", "Password2").unwrap());
    assert!(doc.has_changed());
    assert_eq!(doc.passphrase(), Some("Password2".as_bytes()));
}

#[test]
fn validate_passphrase_has_no_side_effects() {
    let mut doc = Document::new("Password");
    doc.add_entry(Entry::with_title("Test")).unwrap();
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();

    assert!(!doc.validate_passphrase("Password2"));
    assert!(!doc.has_changed());
    assert!(doc.validate_passphrase("Password"));
    assert!(!doc.has_changed());
}

// ---------------------------------------------------------------------------
// Entry lookup
// ---------------------------------------------------------------------------

#[test]
fn lookup_by_title_and_group() {
    let mut doc = Document::new("Password");
    doc.add_entry(Entry::with_group_and_title(GroupPath::from("X.Y"), "A"))
        .unwrap();
    doc.add_entry(Entry::with_group_and_title(GroupPath::from("Z"), "A"))
        .unwrap();

    // Title lookup is first-match.
    assert_eq!(doc.find_entry("A"), Some(0));
    assert_eq!(
        doc.find_entry_in_group(&GroupPath::from("Z"), "A"),
        Some(1)
    );
    assert_eq!(doc.find_entry_in_group(&GroupPath::from("Q"), "A"), None);
    assert_eq!(doc.find_entry("B"), None);
}

#[test]
fn entry_or_insert_creates_with_defaults() {
    let mut doc = Document::new("Password");
    {
        let mut entry = doc.entry_or_insert("Test").unwrap();
        assert_eq!(entry.title().unwrap(), "Test");
        assert!(entry.uuid().unwrap().is_some());
        entry.set_password("Old").unwrap();
    }
    assert_eq!(doc.entry_count(), 1);

    // Second call finds the same entry.
    let mut entry = doc.entry_or_insert("Test").unwrap();
    assert_eq!(entry.password().unwrap(), "Old");
}

#[test]
fn renamed_entry_is_found_under_new_title() {
    let mut doc = Document::new("Password");
    doc.add_entry(Entry::with_title("A")).unwrap();

    doc.entry_by_title_mut("A").unwrap().set_title("B").unwrap();
    assert!(doc.find_entry("A").is_none());
    assert_eq!(doc.find_entry("B"), Some(0));
}

// ---------------------------------------------------------------------------
// Unknown field preservation
// ---------------------------------------------------------------------------

#[test]
fn unknown_record_types_roundtrip() {
    let mut doc = Document::new("Password");
    doc.set_track_access(false);
    doc.set_track_modify(false);
    let index = doc.add_entry(Entry::with_title("Test")).unwrap();
    doc.entry_mut(index)
        .unwrap()
        .set_bytes(RecordType::Other(0xE7), &[1, 2, 3, 4, 5])
        .unwrap();

    let mut reloaded = save_and_reload(&mut doc, "Password");
    let bytes = reloaded.entry_mut(0).unwrap().bytes(RecordType::Other(0xE7));
    assert_eq!(bytes.as_deref(), Some(&[1u8, 2, 3, 4, 5][..]));
}

#[test]
fn kind_mismatch_is_format_error() {
    let mut doc = Document::new("Password");
    let index = doc.add_entry(Entry::with_title("Test")).unwrap();

    let mut entry = doc.entry_mut(index).unwrap();
    assert!(matches!(
        entry.time(RecordType::Title),
        Err(VaultError::Format(_))
    ));
    assert!(matches!(
        entry.set_time(RecordType::Title, Utc::now()),
        Err(VaultError::Format(_))
    ));
}

// ---------------------------------------------------------------------------
// Password history
// ---------------------------------------------------------------------------

/// Build a document holding one entry with password "3" and a history
/// of capacity 2 holding passwords "1" and "2".
fn document_with_history() -> Document {
    let time_1 = Utc.with_ymd_and_hms(2016, 6, 25, 20, 32, 15).unwrap();
    let time_2 = Utc.with_ymd_and_hms(2016, 6, 25, 20, 32, 27).unwrap();
    let time_3 = Utc.with_ymd_and_hms(2016, 6, 25, 20, 32, 44).unwrap();

    let mut doc = Document::new("123");
    doc.set_track_access(false);
    doc.set_track_modify(false);

    let index = doc.add_entry(Entry::with_title("Test")).unwrap();
    let mut entry = doc.entry_mut(index).unwrap();
    entry.set_password("3").unwrap();
    entry.set_creation_time(time_1).unwrap();
    entry.set_password_modification_time(time_3).unwrap();

    let mut history = PasswordHistory::new(2);
    history.push(time_1, "1");
    history.push(time_2, "2");
    entry.set_password_history(&history).unwrap();

    let mut doc = save_and_reload(&mut doc, "123");
    doc.set_track_access(false);
    doc.set_track_modify(false);
    assert!(!doc.has_changed());
    doc
}

#[test]
fn password_change_captures_history_and_evicts_oldest() {
    let mut doc = document_with_history();
    let time_2 = Utc.with_ymd_and_hms(2016, 6, 25, 20, 32, 27).unwrap();
    let time_3 = Utc.with_ymd_and_hms(2016, 6, 25, 20, 32, 44).unwrap();

    {
        let mut entry = doc.entry_mut(0).unwrap();
        let history = entry.password_history().unwrap();
        assert!(history.enabled());
        assert_eq!(history.maximum_count(), 2);
        assert_eq!(history.len(), 2);

        entry.set_password("4").unwrap();
    }
    assert!(doc.has_changed());

    let mut doc = save_and_reload(&mut doc, "123");
    doc.set_track_access(false);
    doc.set_track_modify(false);

    let mut entry = doc.entry_mut(0).unwrap();
    assert_eq!(entry.password().unwrap(), "4");
    let history = entry.password_history().unwrap();
    assert_eq!(history.len(), 2);
    // Oldest ("1") evicted; previous password "3" appended newest-last
    // with its prior modification time.
    assert_eq!(history.get(0).unwrap().historical_password, "2");
    assert_eq!(history.get(0).unwrap().time_first_used, time_2);
    assert_eq!(history.get(1).unwrap().historical_password, "3");
    assert_eq!(history.get(1).unwrap().time_first_used, time_3);
}

#[test]
fn raising_capacity_keeps_all_three() {
    let mut doc = document_with_history();
    {
        let mut entry = doc.entry_mut(0).unwrap();
        let mut history = entry.password_history().unwrap();
        history.set_maximum_count(3);
        entry.set_password_history(&history).unwrap();
        entry.set_password("4").unwrap();
    }

    let mut doc = save_and_reload(&mut doc, "123");
    let mut entry = doc.entry_mut(0).unwrap();
    let history = entry.password_history().unwrap();
    assert_eq!(history.maximum_count(), 3);
    assert_eq!(history.len(), 3);
    assert_eq!(history.get(0).unwrap().historical_password, "1");
    assert_eq!(history.get(1).unwrap().historical_password, "2");
    assert_eq!(history.get(2).unwrap().historical_password, "3");
}

#[test]
fn disabled_history_captures_nothing() {
    let mut doc = document_with_history();
    {
        let mut entry = doc.entry_mut(0).unwrap();
        let mut history = entry.password_history().unwrap();
        history.set_enabled(false);
        entry.set_password_history(&history).unwrap();

        entry.set_password("4").unwrap();
    }
    assert!(doc.has_changed());

    let mut doc = save_and_reload(&mut doc, "123");
    let mut entry = doc.entry_mut(0).unwrap();
    assert_eq!(entry.password().unwrap(), "4");
    let history = entry.password_history().unwrap();
    assert!(!history.enabled());
    assert_eq!(history.maximum_count(), 2);
    assert_eq!(history.len(), 0);
}

#[test]
fn clearing_history_keeps_flag_and_capacity() {
    let mut doc = document_with_history();
    {
        let mut entry = doc.entry_mut(0).unwrap();
        entry.set_password("4").unwrap();

        let mut history = entry.password_history().unwrap();
        assert_eq!(history.len(), 2);
        history.clear();
        entry.set_password_history(&history).unwrap();
    }

    let mut doc = save_and_reload(&mut doc, "123");
    let mut entry = doc.entry_mut(0).unwrap();
    let history = entry.password_history().unwrap();
    assert!(history.enabled());
    assert_eq!(history.maximum_count(), 2);
    assert_eq!(history.len(), 0);
}

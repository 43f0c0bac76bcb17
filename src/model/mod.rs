//! The in-memory object model: documents, headers, entries, records,
//! and the derived views (password history, policies, group paths,
//! autotype tokens).
//!
//! Every value read or write on an attached header or record funnels
//! through the owning document's tracking state, which is what keeps
//! last-modified/last-accessed stamps and the dirty flag reproducible
//! across save/load round trips.

pub mod autotype;
pub mod document;
pub mod entry;
pub mod field;
pub mod grouppath;
pub mod header;
pub mod history;
pub mod policy;
pub mod record;

pub use autotype::{AutotypeContext, AutotypeToken};
pub use document::Document;
pub use entry::{Entry, EntryMut};
pub use field::FieldKind;
pub use grouppath::GroupPath;
pub use header::{Header, HeaderType};
pub use history::{PasswordHistory, PasswordHistoryItem};
pub use policy::{NamedPasswordPolicy, PasswordPolicy, PasswordPolicyStyle};
pub use record::{Record, RecordType};

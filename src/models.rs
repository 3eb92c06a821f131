//! Core data types that flow between the line source, the matcher, and
//! the store.

use std::collections::BTreeMap;

/// Named values extracted from one line, keyed by placeholder name.
pub type Fields = BTreeMap<String, String>;

/// Placeholder name whose value becomes the entry timestamp.
pub const DATETIME_FIELD: &str = "datetime";

/// A log row, resolved or created by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHandle {
    pub id: i64,
    /// True when this run inserted the row.
    pub created: bool,
}

/// An entry ready to be written.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub entry_id: String,
    pub log_id: i64,
    /// `None` in compact mode.
    pub full: Option<String>,
    pub time: i64,
}

/// Resolved entry timestamp in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub unix: i64,
    /// Set when a `datetime` field was present but could not be parsed.
    pub fallback: bool,
}

/// What happened to a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Stored {
        entry_id: String,
        fields: usize,
        date_fallback: bool,
    },
    /// The line did not satisfy the template.
    Dropped { warned: bool },
}

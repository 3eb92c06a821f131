//! Fatal error taxonomy for a collect run.
//!
//! Only conditions that abort a run live here. A line that does not match
//! the template, or carries an unparseable `datetime`, is handled at the
//! line level and reported through [`LineOutcome`](crate::models::LineOutcome).

use std::path::PathBuf;

use thiserror::Error;

use crate::format::FormatError;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Opening or reading the log file failed (anything but end-of-file).
    #[error("failed to read log file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any statement against the store failed.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// A freshly inserted log row could not be found again.
    #[error("log \"{log_name}\" missing immediately after insert")]
    Consistency { log_name: String },

    #[error(transparent)]
    Format(#[from] FormatError),
}

impl IngestError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

//! Collect run orchestration.
//!
//! A run walks through these states:
//!
//! ```text
//! Idle ─▶ TransactionOpen ─▶ LogResolved ─▶ Streaming ─▶ Committed
//!               │                 │              │
//!               └─────────────────┴──────────────┴─────▶ RolledBack
//! ```
//!
//! Everything after `Idle` happens inside one `BEGIN EXCLUSIVE` transaction,
//! including creation of the log row, so a failed run leaves no trace in
//! the store. Lines that do not match the template and unparseable dates
//! are handled per line and never abort the run.

use std::fmt;
use std::path::PathBuf;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::format::Format;
use crate::ident::EntryIdGenerator;
use crate::lines::{LineSource, DEFAULT_CAPACITY};
use crate::models::LineOutcome;
use crate::store::{self, EntryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    TransactionOpen,
    LogResolved,
    Streaming,
    Committed,
    RolledBack,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::TransactionOpen => "transaction-open",
            RunState::LogResolved => "log-resolved",
            RunState::Streaming => "streaming",
            RunState::Committed => "committed",
            RunState::RolledBack => "rolled-back",
        };
        f.write_str(name)
    }
}

/// Everything a single collect run needs.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub log_name: String,
    pub source: PathBuf,
    pub format: Format,
    pub entry: EntryPolicy,
    /// Suppress warnings for lines that do not match the format.
    pub relax: bool,
    /// Line source capacity.
    pub buffer: usize,
}

impl IngestOptions {
    /// Options with the log named after its path and default policies.
    pub fn new(source: impl Into<PathBuf>, format: Format) -> Self {
        let source = source.into();
        Self {
            log_name: source.to_string_lossy().into_owned(),
            source,
            format,
            entry: EntryPolicy::default(),
            relax: false,
            buffer: DEFAULT_CAPACITY,
        }
    }

    /// Like [`IngestOptions::new`], compiling `template` first.
    pub fn from_template(source: impl Into<PathBuf>, template: &str) -> Result<Self> {
        let format = Format::compile(template)?;
        Ok(Self::new(source, format))
    }
}

/// Counters for a committed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub log_id: i64,
    pub log_created: bool,
    pub lines_read: u64,
    pub entries_written: u64,
    pub fields_written: u64,
    pub lines_dropped: u64,
    pub drop_warnings: u64,
    pub date_fallbacks: u64,
}

struct Run {
    state: RunState,
}

impl Run {
    fn advance(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "run state");
        self.state = next;
    }
}

/// Ingest one log file as a single atomic unit.
///
/// On failure the transaction is rolled back before the original error is
/// returned; a failed rollback is only logged.
pub async fn run_ingest(pool: &SqlitePool, opts: &IngestOptions) -> Result<IngestReport> {
    let mut run = Run {
        state: RunState::Idle,
    };

    let mut tx = pool.begin_with("BEGIN EXCLUSIVE TRANSACTION").await?;
    run.advance(RunState::TransactionOpen);

    let report = match stream_log(&mut tx, opts, &mut run).await {
        Ok(report) => report,
        Err(e) => {
            warn!(state = %run.state, error = %e, "collect failed, rolling back transaction");
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "rollback failed");
            }
            run.advance(RunState::RolledBack);
            return Err(e);
        }
    };

    // A failed COMMIT leaves the guard open; dropping it rolls back.
    if let Err(e) = tx.commit().await {
        warn!(error = %e, "commit failed, transaction rolled back");
        run.advance(RunState::RolledBack);
        return Err(e.into());
    }
    run.advance(RunState::Committed);

    info!(
        log = %opts.log_name,
        lines = report.lines_read,
        entries = report.entries_written,
        dropped = report.lines_dropped,
        "committed"
    );
    Ok(report)
}

async fn stream_log(
    conn: &mut SqliteConnection,
    opts: &IngestOptions,
    run: &mut Run,
) -> Result<IngestReport> {
    let filename = opts.source.to_string_lossy();
    let log = store::get_or_create_log(conn, &opts.log_name, &filename).await?;
    run.advance(RunState::LogResolved);

    info!(
        path = %opts.source.display(),
        format = opts.format.template(),
        fields = ?opts.format.field_names(),
        "reading log file"
    );
    let mut lines = LineSource::open(&opts.source, opts.buffer).await?;
    run.advance(RunState::Streaming);

    let mut ids = EntryIdGenerator::new();
    let mut report = IngestReport {
        log_id: log.id,
        log_created: log.created,
        ..Default::default()
    };

    while let Some(line) = lines.next_line().await? {
        report.lines_read += 1;
        match process_line(conn, &mut ids, log.id, &line, opts).await? {
            LineOutcome::Stored {
                fields,
                date_fallback,
                ..
            } => {
                report.entries_written += 1;
                report.fields_written += fields as u64;
                if date_fallback {
                    report.date_fallbacks += 1;
                }
            }
            LineOutcome::Dropped { warned } => {
                report.lines_dropped += 1;
                if warned {
                    report.drop_warnings += 1;
                }
            }
        }
    }

    Ok(report)
}

/// Match one line and persist it, or drop it when it does not fit the
/// format.
pub async fn process_line(
    conn: &mut SqliteConnection,
    ids: &mut EntryIdGenerator,
    log_id: i64,
    line: &str,
    opts: &IngestOptions,
) -> Result<LineOutcome> {
    let Some(fields) = opts.format.match_line(line) else {
        if !opts.relax {
            warn!(line, "line does not match format, dropped");
        }
        return Ok(LineOutcome::Dropped {
            warned: !opts.relax,
        });
    };

    store::persist_line(conn, ids, log_id, line, &fields, &opts.entry).await
}

//! Log resolution and entry persistence.
//!
//! Every function here takes a borrowed [`SqliteConnection`] so callers can
//! pass `&mut *tx` and keep all writes of a run inside one transaction.
//! Nothing in this module commits.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::error::{IngestError, Result};
use crate::ident::EntryIdGenerator;
use crate::models::{Fields, LineOutcome, LogHandle, NewEntry, Timestamp, DATETIME_FIELD};

/// Per-entry write policy shared by every line of a run.
#[derive(Debug, Clone)]
pub struct EntryPolicy {
    /// chrono strftime layout for the `datetime` field.
    pub date_layout: String,
    /// Omit the full line text from entries.
    pub compact: bool,
}

impl Default for EntryPolicy {
    fn default() -> Self {
        Self {
            date_layout: "%Y-%m-%d %H:%M".to_string(),
            compact: false,
        }
    }
}

async fn find_log(conn: &mut SqliteConnection, name: &str) -> Result<Option<i64>> {
    let id = sqlx::query_scalar("SELECT log_id FROM logs WHERE log_name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(id)
}

/// Return the log row named `name`, inserting it first if absent.
///
/// A row that cannot be found right after its insert is reported as
/// [`IngestError::Consistency`] and never retried.
pub async fn get_or_create_log(
    conn: &mut SqliteConnection,
    name: &str,
    filename: &str,
) -> Result<LogHandle> {
    if let Some(id) = find_log(conn, name).await? {
        info!(log = name, id, "using log");
        return Ok(LogHandle { id, created: false });
    }

    sqlx::query("INSERT INTO logs (log_name, filename) VALUES (?, ?)")
        .bind(name)
        .bind(filename)
        .execute(&mut *conn)
        .await?;

    match find_log(conn, name).await? {
        Some(id) => {
            info!(log = name, id, "created log");
            Ok(LogHandle { id, created: true })
        }
        None => Err(IngestError::Consistency {
            log_name: name.to_string(),
        }),
    }
}

/// Parse `value` with a strftime `layout`.
///
/// Layouts carrying an offset (`%z`) yield that instant; otherwise the
/// value is read as UTC. Date-only layouts resolve to midnight.
pub fn parse_datetime(value: &str, layout: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    if let Ok(dt) = DateTime::parse_from_str(value, layout) {
        return Ok(dt.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(value, layout) {
        Ok(naive) => Ok(naive.and_utc()),
        Err(err) => NaiveDate::parse_from_str(value, layout)
            .map(|date| date.and_time(NaiveTime::MIN).and_utc())
            .map_err(|_| err),
    }
}

/// Pick the entry timestamp: the parsed `datetime` field when present and
/// valid, `now` otherwise. An unparseable `datetime` is warned about.
pub fn resolve_timestamp(fields: &Fields, layout: &str, now: DateTime<Utc>) -> Timestamp {
    let Some(raw) = fields.get(DATETIME_FIELD) else {
        return Timestamp {
            unix: now.timestamp(),
            fallback: false,
        };
    };

    match parse_datetime(raw, layout) {
        Ok(dt) => Timestamp {
            unix: dt.timestamp(),
            fallback: false,
        },
        Err(e) => {
            warn!(value = %raw, layout, error = %e, "unparseable datetime, using ingestion time");
            Timestamp {
                unix: now.timestamp(),
                fallback: true,
            }
        }
    }
}

pub async fn insert_entry(conn: &mut SqliteConnection, entry: &NewEntry) -> Result<()> {
    sqlx::query(
        "INSERT INTO entries (log_id, entry_id, entry_full, entry_time) VALUES (?, ?, ?, ?)",
    )
    .bind(entry.log_id)
    .bind(&entry.entry_id)
    .bind(&entry.full)
    .bind(entry.time)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Write one `strings` row per field. Returns the number written.
pub async fn insert_fields(
    conn: &mut SqliteConnection,
    entry_id: &str,
    fields: &Fields,
) -> Result<usize> {
    for (name, value) in fields {
        sqlx::query("INSERT INTO strings (column_name, entry_id, string_value) VALUES (?, ?, ?)")
            .bind(name)
            .bind(entry_id)
            .bind(value)
            .execute(&mut *conn)
            .await?;
    }
    Ok(fields.len())
}

/// Persist a matched line: one entry row plus its field projections.
pub async fn persist_line(
    conn: &mut SqliteConnection,
    ids: &mut EntryIdGenerator,
    log_id: i64,
    line: &str,
    fields: &Fields,
    policy: &EntryPolicy,
) -> Result<LineOutcome> {
    let time = resolve_timestamp(fields, &policy.date_layout, Utc::now());
    let entry = NewEntry {
        entry_id: ids.next_id(log_id, line),
        log_id,
        full: (!policy.compact).then(|| line.to_string()),
        time: time.unix,
    };

    insert_entry(conn, &entry).await?;
    let written = insert_fields(conn, &entry.entry_id, fields).await?;

    Ok(LineOutcome::Stored {
        entry_id: entry.entry_id,
        fields: written,
        date_fallback: time.fallback,
    })
}

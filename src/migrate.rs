//! Schema creation and store reset.
//!
//! Four tables make up the store:
//!
//! | Table | Rows |
//! |-------|------|
//! | `logs` | one per distinct log name |
//! | `entries` | one per matched line |
//! | `strings` | one per extracted field per entry |
//! | `stats` | numeric field projections (reserved, not yet written) |

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS logs (
        log_id INTEGER PRIMARY KEY AUTOINCREMENT,
        log_name TEXT NOT NULL UNIQUE,
        filename TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS entries (
        log_id INTEGER NOT NULL,
        entry_id TEXT PRIMARY KEY,
        entry_full TEXT,
        entry_time INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS entries_log_id ON entries(log_id)",
    "CREATE INDEX IF NOT EXISTS entries_entry_time ON entries(entry_time)",
    r#"
    CREATE TABLE IF NOT EXISTS stats (
        column_name TEXT NOT NULL,
        entry_id TEXT NOT NULL,
        stat_value INTEGER,
        UNIQUE(column_name, entry_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS stats_column_name ON stats(column_name)",
    "CREATE INDEX IF NOT EXISTS stats_entry_id ON stats(entry_id)",
    r#"
    CREATE TABLE IF NOT EXISTS strings (
        column_name TEXT NOT NULL,
        entry_id TEXT NOT NULL,
        string_value TEXT,
        UNIQUE(column_name, entry_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS strings_column_name ON strings(column_name)",
    "CREATE INDEX IF NOT EXISTS strings_entry_id ON strings(entry_id)",
];

/// Create any missing tables and indexes. Safe to run on every start.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for stmt in SCHEMA {
        sqlx::query(*stmt).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Delete the store file and its WAL sidecars so the next connect starts
/// from an empty database. A store that does not exist yet is fine.
pub fn reset_store(db_path: &Path) -> Result<()> {
    info!(path = %db_path.display(), "removing old store");
    for suffix in ["", "-wal", "-shm"] {
        let mut target = db_path.as_os_str().to_owned();
        target.push(suffix);
        match std::fs::remove_file(&target) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to remove {}", Path::new(&target).display())
                })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn table_names(pool: &SqlitePool) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_creates_all_tables() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pool = db::connect(&tmp.path().join("t.db")).await.unwrap();
        run_migrations(&pool).await.unwrap();
        assert_eq!(
            table_names(&pool).await,
            vec!["entries", "logs", "stats", "strings"]
        );
    }

    #[tokio::test]
    async fn test_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pool = db::connect(&tmp.path().join("t.db")).await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();
        assert_eq!(table_names(&pool).await.len(), 4);
    }

    #[tokio::test]
    async fn test_reset_removes_existing_store() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("t.db");
        let pool = db::connect(&path).await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool.close().await;

        reset_store(&path).unwrap();
        assert!(!path.exists());
        // Second reset on a missing store is a no-op.
        reset_store(&path).unwrap();
    }
}

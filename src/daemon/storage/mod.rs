//!  Storage is organized through [usage_storage::SqliteUsageStorage].
//!  The basic idea is:
//!   - Usage is kept as counters keyed by (local calendar day, canonical app name).
//!   - Every counter increment also bumps the day's summary row inside the same transaction, so
//!     readers never see one without the other.
//!   - Rows are only ever added to. Nothing in the tracker deletes them.

use thiserror::Error;

pub mod entities;
pub mod schema;
pub mod usage_storage;

/// Errors produced by the usage store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create database directory {path}")]
    CreateDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("database version ({found}) is newer than supported schema ({supported})")]
    SchemaTooNew { found: i32, supported: i32 },
    #[error("app name must not be empty")]
    EmptyAppName,
    #[error("value {0} exceeds SQLite INTEGER range")]
    Overflow(u64),
    #[error("negative value {value} stored in {column}")]
    Negative { column: &'static str, value: i64 },
    #[error("invalid date '{value}' stored in {column}")]
    InvalidDate {
        column: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

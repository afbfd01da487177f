//! Database module for SQLite operations.
//!
//! This module provides the `Database` struct and all database operations
//! organized into submodules by table.

mod artifacts;
mod batches;
mod migrations;
pub mod models;
mod records;

pub use models::{
    ArtifactRecord, Batch, BatchDocument, BatchStatus, IngestedDocument, StatementRecord,
};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::error::{DatabaseError, ServiceError, ServiceResult};

/// Database manager for SQLite operations
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database at the given path
    pub fn open(path: &Path) -> ServiceResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ServiceError::Database(DatabaseError::Connection(
                    rusqlite::Error::ToSqlConversionFailure(Box::new(e)),
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(DatabaseError::Connection)?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(DatabaseError::Query)?;

        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// A panic while holding the lock cannot leave a half-applied
    /// statement behind (SQLite rolls back), so poisoning is ignored.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp read from column `index`.
pub(crate) fn parse_timestamp(index: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Read a text column through `FromStr`, reporting failures as conversion errors.
pub(crate) fn parse_column<T>(row: &Row<'_>, index: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value: String = row.get(index)?;
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_uuid(row: &Row<'_>, index: usize) -> rusqlite::Result<Uuid> {
    parse_column(row, index)
}

//! Database model structs.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::{parse_column, parse_timestamp, parse_uuid};
use crate::export::OutputFormat;
use crate::ingestion::{Amount, Bank, Direction, Movement};

/// Batch lifecycle
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BatchStatus {
    /// Files are being stored and parsed
    Ingesting,
    /// Every document parsed; records are available
    Completed,
    /// Some document failed; nothing was kept
    Failed,
}

/// Upload batch record
#[derive(Debug, Clone, Serialize)]
pub struct Batch {
    pub id: Uuid,
    pub status: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub document_count: usize,
    pub record_count: usize,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Batch {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let document_count: i64 = row.get(3)?;
        let record_count: i64 = row.get(4)?;
        let created_at: String = row.get(5)?;
        let completed_at: Option<String> = row.get(6)?;

        Ok(Self {
            id: parse_uuid(row, 0)?,
            status: parse_column(row, 1)?,
            error: row.get(2)?,
            document_count: document_count as usize,
            record_count: record_count as usize,
            created_at: parse_timestamp(5, &created_at)?,
            completed_at: completed_at
                .as_deref()
                .map(|value| parse_timestamp(6, value))
                .transpose()?,
        })
    }
}

/// One stored PDF of a batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchDocument {
    pub position: usize,
    pub filename: String,
    /// Path on disk; never exposed to clients
    #[serde(skip)]
    pub stored_path: String,
    pub file_hash: String,
    pub size_bytes: u64,
    pub bank: Bank,
    pub statement_year: i32,
    pub record_count: usize,
}

impl BatchDocument {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let position: i64 = row.get(0)?;
        let size_bytes: i64 = row.get(4)?;
        let record_count: i64 = row.get(7)?;

        Ok(Self {
            position: position as usize,
            filename: row.get(1)?,
            stored_path: row.get(2)?,
            file_hash: row.get(3)?,
            size_bytes: size_bytes as u64,
            bank: parse_column(row, 5)?,
            statement_year: row.get(6)?,
            record_count: record_count as usize,
        })
    }
}

/// A document ready to be committed together with its movements
#[derive(Debug, Clone)]
pub struct IngestedDocument {
    pub document: BatchDocument,
    pub movements: Vec<Movement>,
}

/// Extracted movement as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementRecord {
    pub document_position: usize,
    pub position: usize,
    pub bank: Bank,
    pub operation_date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub amount: Amount,
    pub balance: Option<Amount>,
    pub direction: Direction,
}

impl StatementRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let document_position: i64 = row.get(0)?;
        let position: i64 = row.get(1)?;
        let amount_cents: i64 = row.get(6)?;
        let balance_cents: Option<i64> = row.get(7)?;

        Ok(Self {
            document_position: document_position as usize,
            position: position as usize,
            bank: parse_column(row, 2)?,
            operation_date: parse_column(row, 3)?,
            description: row.get(4)?,
            reference: row.get(5)?,
            amount: Amount::from_cents(amount_cents),
            balance: balance_cents.map(Amount::from_cents),
            direction: parse_column(row, 8)?,
        })
    }
}

/// Generated artifact record
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRecord {
    pub batch_id: Uuid,
    pub format: OutputFormat,
    pub file_name: String,
    pub sha256: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let size_bytes: i64 = row.get(4)?;
        let created_at: String = row.get(5)?;

        Ok(Self {
            batch_id: parse_uuid(row, 0)?,
            format: parse_column(row, 1)?,
            file_name: row.get(2)?,
            sha256: row.get(3)?,
            size_bytes: size_bytes as u64,
            created_at: parse_timestamp(5, &created_at)?,
        })
    }

    /// Server-relative path handed to clients
    pub fn relative_path(&self) -> String {
        crate::export::artifact_relative_path(self.batch_id, &self.file_name)
    }
}

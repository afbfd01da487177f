//! Batch lifecycle operations.
//!
//! A batch is inserted as `ingesting`, then either completed in one
//! transaction together with its documents and records, or marked failed.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use super::models::{Batch, BatchDocument, BatchStatus, IngestedDocument};
use super::{Database, parse_uuid, timestamp};
use crate::error::{DatabaseError, ServiceResult};

const BATCH_COLUMNS: &str =
    "id, status, error, document_count, record_count, created_at, completed_at";

impl Database {
    /// Register a new batch in the `ingesting` state
    pub fn insert_batch(&self, id: Uuid, created_at: DateTime<Utc>) -> ServiceResult<()> {
        let conn = self.conn();

        conn.execute(
            "INSERT INTO batches (id, status, created_at) VALUES (?1, ?2, ?3)",
            params![
                id.to_string(),
                BatchStatus::Ingesting.as_ref(),
                timestamp(created_at)
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Store every document and movement and mark the batch completed,
    /// all in a single transaction.
    pub fn complete_batch(&self, id: Uuid, documents: &[IngestedDocument]) -> ServiceResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(DatabaseError::Query)?;
        let batch_id = id.to_string();
        let mut record_count = 0usize;

        {
            let mut insert_document = tx
                .prepare(
                    "INSERT INTO batch_documents \
                     (batch_id, position, filename, stored_path, file_hash, size_bytes, bank, statement_year, record_count) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )
                .map_err(DatabaseError::Query)?;
            let mut insert_record = tx
                .prepare(
                    "INSERT INTO statement_records \
                     (batch_id, document_position, position, bank, operation_date, description, reference, amount_cents, balance_cents, direction) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                )
                .map_err(DatabaseError::Query)?;

            for ingested in documents {
                let doc = &ingested.document;
                insert_document
                    .execute(params![
                        batch_id,
                        doc.position as i64,
                        doc.filename,
                        doc.stored_path,
                        doc.file_hash,
                        doc.size_bytes as i64,
                        doc.bank.as_ref(),
                        doc.statement_year,
                        ingested.movements.len() as i64,
                    ])
                    .map_err(DatabaseError::Query)?;

                for (position, movement) in ingested.movements.iter().enumerate() {
                    insert_record
                        .execute(params![
                            batch_id,
                            doc.position as i64,
                            position as i64,
                            doc.bank.as_ref(),
                            movement.operation_date.to_string(),
                            movement.description,
                            movement.reference,
                            movement.amount.cents(),
                            movement.balance.map(|b| b.cents()),
                            movement.direction.as_ref(),
                        ])
                        .map_err(DatabaseError::Query)?;
                }

                record_count += ingested.movements.len();
            }
        }

        tx.execute(
            "UPDATE batches SET status = ?1, error = NULL, document_count = ?2, record_count = ?3, completed_at = ?4 \
             WHERE id = ?5",
            params![
                BatchStatus::Completed.as_ref(),
                documents.len() as i64,
                record_count as i64,
                timestamp(Utc::now()),
                batch_id,
            ],
        )
        .map_err(DatabaseError::Query)?;

        tx.commit().map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Mark a batch failed. Returns false if the batch does not exist.
    pub fn fail_batch(&self, id: Uuid, error: &str) -> ServiceResult<bool> {
        let conn = self.conn();

        let rows = conn
            .execute(
                "UPDATE batches SET status = ?1, error = ?2, completed_at = ?3 WHERE id = ?4",
                params![
                    BatchStatus::Failed.as_ref(),
                    error,
                    timestamp(Utc::now()),
                    id.to_string()
                ],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }

    /// Fail batches a previous process left in `ingesting`; returns their ids.
    pub fn fail_stale_ingesting(&self, error: &str) -> ServiceResult<Vec<Uuid>> {
        let conn = self.conn();

        let ids: Vec<Uuid> = {
            let mut stmt = conn
                .prepare("SELECT id FROM batches WHERE status = ?1")
                .map_err(DatabaseError::Query)?;
            stmt.query_map(params![BatchStatus::Ingesting.as_ref()], |row| {
                parse_uuid(row, 0)
            })
            .map_err(DatabaseError::Query)?
            .collect::<Result<_, _>>()
            .map_err(DatabaseError::Query)?
        };

        conn.execute(
            "UPDATE batches SET status = ?1, error = ?2, completed_at = ?3 WHERE status = ?4",
            params![
                BatchStatus::Failed.as_ref(),
                error,
                timestamp(Utc::now()),
                BatchStatus::Ingesting.as_ref()
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(ids)
    }

    /// Get a batch by ID
    pub fn get_batch(&self, id: Uuid) -> ServiceResult<Option<Batch>> {
        let conn = self.conn();

        conn.query_row(
            &format!("SELECT {} FROM batches WHERE id = ?1", BATCH_COLUMNS),
            params![id.to_string()],
            Batch::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    /// Documents of a batch in upload order
    pub fn list_documents(&self, id: Uuid) -> ServiceResult<Vec<BatchDocument>> {
        let conn = self.conn();

        let mut stmt = conn
            .prepare(
                "SELECT position, filename, stored_path, file_hash, size_bytes, bank, statement_year, record_count \
                 FROM batch_documents WHERE batch_id = ?1 ORDER BY position",
            )
            .map_err(DatabaseError::Query)?;

        let documents = stmt
            .query_map(params![id.to_string()], BatchDocument::from_row)
            .map_err(DatabaseError::Query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::Query)?;

        Ok(documents)
    }

    /// Batches created before `cutoff`, oldest first
    pub fn expired_batches(&self, cutoff: DateTime<Utc>) -> ServiceResult<Vec<Uuid>> {
        let conn = self.conn();

        let mut stmt = conn
            .prepare("SELECT id FROM batches WHERE created_at < ?1 ORDER BY created_at")
            .map_err(DatabaseError::Query)?;

        let ids = stmt
            .query_map(params![timestamp(cutoff)], |row| parse_uuid(row, 0))
            .map_err(DatabaseError::Query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::Query)?;

        Ok(ids)
    }

    /// Delete a batch and, through cascades, its documents, records and artifacts
    pub fn delete_batch(&self, id: Uuid) -> ServiceResult<bool> {
        let conn = self.conn();

        let rows = conn
            .execute("DELETE FROM batches WHERE id = ?1", params![id.to_string()])
            .map_err(DatabaseError::Query)?;

        Ok(rows > 0)
    }
}

//! Statement record queries.

use rusqlite::params;
use uuid::Uuid;

use super::Database;
use super::models::StatementRecord;
use crate::error::{DatabaseError, ServiceResult};

impl Database {
    /// All records of a batch in document, then statement, order
    pub fn list_records(&self, batch_id: Uuid) -> ServiceResult<Vec<StatementRecord>> {
        let conn = self.conn();

        let mut stmt = conn
            .prepare(
                "SELECT document_position, position, bank, operation_date, description, reference, amount_cents, balance_cents, direction \
                 FROM statement_records WHERE batch_id = ?1 ORDER BY document_position, position",
            )
            .map_err(DatabaseError::Query)?;

        let records = stmt
            .query_map(params![batch_id.to_string()], StatementRecord::from_row)
            .map_err(DatabaseError::Query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::Query)?;

        Ok(records)
    }
}

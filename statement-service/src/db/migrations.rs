//! Database schema migrations.

use rusqlite::Connection;

use crate::error::{DatabaseError, ServiceResult};

/// Create the schema if it does not exist yet.
pub(super) fn run_migrations(conn: &Connection) -> ServiceResult<()> {
    conn.execute_batch(
        r#"
        -- Upload batches
        CREATE TABLE IF NOT EXISTS batches (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL DEFAULT 'ingesting',
            error TEXT,
            document_count INTEGER NOT NULL DEFAULT 0,
            record_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            completed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_batches_status ON batches(status);
        CREATE INDEX IF NOT EXISTS idx_batches_created ON batches(created_at);

        -- Stored statement PDFs, in upload order
        CREATE TABLE IF NOT EXISTS batch_documents (
            batch_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            filename TEXT NOT NULL,
            stored_path TEXT NOT NULL,
            file_hash TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            bank TEXT NOT NULL,
            statement_year INTEGER NOT NULL,
            record_count INTEGER NOT NULL,
            PRIMARY KEY (batch_id, position),
            FOREIGN KEY (batch_id) REFERENCES batches(id) ON DELETE CASCADE
        );

        -- Extracted movements; money in cents
        CREATE TABLE IF NOT EXISTS statement_records (
            batch_id TEXT NOT NULL,
            document_position INTEGER NOT NULL,
            position INTEGER NOT NULL,
            bank TEXT NOT NULL,
            operation_date TEXT NOT NULL,
            description TEXT NOT NULL,
            reference TEXT,
            amount_cents INTEGER NOT NULL,
            balance_cents INTEGER,
            direction TEXT NOT NULL,
            PRIMARY KEY (batch_id, document_position, position),
            FOREIGN KEY (batch_id, document_position)
                REFERENCES batch_documents(batch_id, position) ON DELETE CASCADE
        );

        -- Generated files, one per batch and format
        CREATE TABLE IF NOT EXISTS artifacts (
            batch_id TEXT NOT NULL,
            format TEXT NOT NULL,
            file_name TEXT NOT NULL,
            sha256 TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (batch_id, format),
            FOREIGN KEY (batch_id) REFERENCES batches(id) ON DELETE CASCADE
        );
        "#,
    )
    .map_err(|e| DatabaseError::Migration {
        message: e.to_string(),
    })?;

    Ok(())
}

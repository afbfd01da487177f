//! Generated artifact bookkeeping.

use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use super::models::ArtifactRecord;
use super::{Database, timestamp};
use crate::error::{DatabaseError, ServiceResult};
use crate::export::OutputFormat;

impl Database {
    /// Get the stored artifact for a batch and format
    pub fn get_artifact(
        &self,
        batch_id: Uuid,
        format: OutputFormat,
    ) -> ServiceResult<Option<ArtifactRecord>> {
        let conn = self.conn();

        conn.query_row(
            "SELECT batch_id, format, file_name, sha256, size_bytes, created_at \
             FROM artifacts WHERE batch_id = ?1 AND format = ?2",
            params![batch_id.to_string(), format.as_ref()],
            ArtifactRecord::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    /// Record a generated artifact, replacing any previous one for the format
    pub fn upsert_artifact(&self, artifact: &ArtifactRecord) -> ServiceResult<()> {
        let conn = self.conn();

        conn.execute(
            "INSERT INTO artifacts (batch_id, format, file_name, sha256, size_bytes, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(batch_id, format) DO UPDATE SET \
             file_name = excluded.file_name, sha256 = excluded.sha256, \
             size_bytes = excluded.size_bytes, created_at = excluded.created_at",
            params![
                artifact.batch_id.to_string(),
                artifact.format.as_ref(),
                artifact.file_name,
                artifact.sha256,
                artifact.size_bytes as i64,
                timestamp(artifact.created_at),
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Look up an artifact by its served file name
    pub fn find_artifact_by_name(
        &self,
        batch_id: Uuid,
        file_name: &str,
    ) -> ServiceResult<Option<ArtifactRecord>> {
        let conn = self.conn();

        conn.query_row(
            "SELECT batch_id, format, file_name, sha256, size_bytes, created_at \
             FROM artifacts WHERE batch_id = ?1 AND file_name = ?2",
            params![batch_id.to_string(), file_name],
            ArtifactRecord::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{open_temp, sample_document};
    use chrono::Utc;

    fn artifact(batch_id: Uuid, format: OutputFormat, sha256: &str) -> ArtifactRecord {
        ArtifactRecord {
            batch_id,
            format,
            file_name: format.file_name(),
            sha256: sha256.to_string(),
            size_bytes: 10,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_artifact_upsert_and_lookup() {
        let (_dir, db) = open_temp();
        let id = Uuid::new_v4();
        db.insert_batch(id, Utc::now()).unwrap();
        db.complete_batch(id, &[sample_document(0, 1)]).unwrap();

        assert!(db.get_artifact(id, OutputFormat::Csv).unwrap().is_none());

        db.upsert_artifact(&artifact(id, OutputFormat::Csv, "one")).unwrap();
        db.upsert_artifact(&artifact(id, OutputFormat::Csv, "two")).unwrap();

        let stored = db.get_artifact(id, OutputFormat::Csv).unwrap().unwrap();
        assert_eq!(stored.sha256, "two");
        assert_eq!(stored.format, OutputFormat::Csv);
        assert!(db.get_artifact(id, OutputFormat::Excel).unwrap().is_none());

        let by_name = db
            .find_artifact_by_name(id, "movimientos_combinados.csv")
            .unwrap()
            .unwrap();
        assert_eq!(by_name.format, OutputFormat::Csv);
        assert!(db.find_artifact_by_name(id, "other.csv").unwrap().is_none());
    }

    #[test]
    fn test_artifacts_require_existing_batch() {
        let (_dir, db) = open_temp();
        let result = db.upsert_artifact(&artifact(Uuid::new_v4(), OutputFormat::Txt, "x"));
        assert!(result.is_err());
    }
}

//! Artifact generation.
//!
//! The first request for a (batch, format) pair renders the artifact and
//! records it; later requests return the recorded file, so repeated downloads
//! are byte-identical. Requests for the same pair are serialized.

use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use std::io::Write;
use tracing::{info, warn};
use uuid::Uuid;

use super::StatementService;
use crate::db::ArtifactRecord;
use crate::error::{ProcessingError, ServiceError, ServiceResult};
use crate::export::{OutputFormat, group_rows};
use crate::ingestion::hash::compute_content_hash;

/// Response of `/generate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    pub file_path: String,
    pub file_type: OutputFormat,
    pub batch_id: Uuid,
    pub sha256: String,
}

impl From<&ArtifactRecord> for GeneratedArtifact {
    fn from(record: &ArtifactRecord) -> Self {
        Self {
            file_path: record.relative_path(),
            file_type: record.format,
            batch_id: record.batch_id,
            sha256: record.sha256.clone(),
        }
    }
}

impl StatementService {
    /// Produce (or return the already produced) artifact for a completed batch.
    pub async fn generate_artifact(
        &self,
        batch_id: Uuid,
        format: OutputFormat,
    ) -> ServiceResult<GeneratedArtifact> {
        let timeout = self.config.limits.generation_timeout();
        tokio::time::timeout(timeout, self.generate_locked(batch_id, format))
            .await
            .map_err(|_| ServiceError::Timeout {
                operation: "generation",
                seconds: timeout.as_secs(),
            })?
    }

    async fn generate_locked(
        &self,
        batch_id: Uuid,
        format: OutputFormat,
    ) -> ServiceResult<GeneratedArtifact> {
        let batch = self.completed_batch(batch_id)?;

        let lock = self
            .generation_locks
            .entry((batch_id, format))
            .or_default()
            .clone();
        let _guard = lock.lock().await;

        if let Some(existing) = self.db.get_artifact(batch_id, format)? {
            let path = self.artifact_dir(batch_id).join(&existing.file_name);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Ok(GeneratedArtifact::from(&existing));
            }
            warn!(batch_id = %batch_id, %format, "Recorded artifact is missing on disk, regenerating");
        }

        let documents = self.db.list_documents(batch_id)?;
        let records = self.db.list_records(batch_id)?;
        let dir = self.artifact_dir(batch_id);
        let created_at = batch.created_at;

        let record = tokio::task::spawn_blocking(move || -> ServiceResult<ArtifactRecord> {
            let sheets = group_rows(&documents, &records);
            let bytes = format.render(created_at, &sheets)?;

            std::fs::create_dir_all(&dir).map_err(ProcessingError::Io)?;
            let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(ProcessingError::Io)?;
            file.write_all(&bytes).map_err(ProcessingError::Io)?;
            file.as_file().sync_all().map_err(ProcessingError::Io)?;

            let file_name = format.file_name();
            file.persist(dir.join(&file_name))
                .map_err(|e| ProcessingError::Io(e.error))?;

            Ok(ArtifactRecord {
                batch_id,
                format,
                file_name,
                sha256: compute_content_hash(&bytes),
                size_bytes: bytes.len() as u64,
                created_at: Utc::now(),
            })
        })
        .await
        .map_err(ProcessingError::Join)??;

        self.db.upsert_artifact(&record)?;
        counter!("statements_artifacts_generated_total", "format" => format.to_string())
            .increment(1);
        info!(
            batch_id = %batch_id,
            %format,
            size = record.size_bytes,
            "Artifact generated"
        );

        Ok(GeneratedArtifact::from(&record))
    }
}

//! Read-only access to batches, their records and generated files.

use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use super::StatementService;
use crate::db::{Batch, BatchDocument, BatchStatus, StatementRecord};
use crate::error::{ServiceError, ServiceResult};
use crate::export::{OutputFormat, artifact_relative_path};

/// Batch status plus its documents
#[derive(Debug, Clone, Serialize)]
pub struct BatchDetails {
    #[serde(flatten)]
    pub batch: Batch,
    pub documents: Vec<BatchDocument>,
}

/// A generated file on disk, ready to be served
#[derive(Debug, Clone)]
pub struct ArtifactFile {
    pub path: PathBuf,
    pub file_name: String,
    pub format: OutputFormat,
}

impl StatementService {
    pub fn get_batch_details(&self, batch_id: Uuid) -> ServiceResult<BatchDetails> {
        let batch = self
            .db
            .get_batch(batch_id)?
            .ok_or_else(|| ServiceError::BatchNotFound {
                batch_id: batch_id.to_string(),
            })?;
        let documents = self.db.list_documents(batch_id)?;

        Ok(BatchDetails { batch, documents })
    }

    /// The batch, if it exists and finished ingesting successfully
    pub fn completed_batch(&self, batch_id: Uuid) -> ServiceResult<Batch> {
        let batch = self
            .db
            .get_batch(batch_id)?
            .ok_or_else(|| ServiceError::BatchNotFound {
                batch_id: batch_id.to_string(),
            })?;

        if batch.status != BatchStatus::Completed {
            return Err(ServiceError::BatchIncomplete {
                batch_id: batch_id.to_string(),
                status: batch.status.to_string(),
            });
        }

        Ok(batch)
    }

    pub fn batch_records(&self, batch_id: Uuid) -> ServiceResult<Vec<StatementRecord>> {
        self.completed_batch(batch_id)?;
        self.db.list_records(batch_id)
    }

    /// Resolve a served artifact path. Only files recorded for the batch
    /// are returned.
    pub async fn locate_artifact(&self, batch_id: Uuid, file_name: &str) -> ServiceResult<ArtifactFile> {
        let not_found = || ServiceError::ArtifactNotFound {
            path: artifact_relative_path(batch_id, file_name),
        };

        let record = self
            .db
            .find_artifact_by_name(batch_id, file_name)?
            .ok_or_else(not_found)?;

        let path = self.artifact_dir(batch_id).join(&record.file_name);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(not_found());
        }

        Ok(ArtifactFile {
            path,
            file_name: record.file_name,
            format: record.format,
        })
    }
}

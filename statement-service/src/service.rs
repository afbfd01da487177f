//! Statement service: batch ingestion, artifact generation and retention.

mod generation;
mod retention;
mod retrieval;
mod upload;

pub use generation::GeneratedArtifact;
pub use retrieval::BatchDetails;
pub use upload::{IngestionSummary, UploadedFile};

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::Database;
use crate::error::{ProcessingError, ServiceResult};
use crate::export::OutputFormat;
use crate::i18n::I18n;
use crate::ingestion::{IngestionService, TextExtractor};

/// Main service coordinator
pub struct StatementService {
    pub config: Arc<AppConfig>,
    pub db: Arc<Database>,
    pub ingestion: Arc<IngestionService>,
    pub i18n: Arc<I18n>,
    /// Bounds concurrent PDF extractions across all batches
    extraction_permits: Arc<Semaphore>,
    /// Serializes generation per batch and format
    generation_locks: DashMap<(Uuid, OutputFormat), Arc<Mutex<()>>>,
}

impl StatementService {
    /// Create a new service instance
    pub fn new(
        config: Arc<AppConfig>,
        db: Arc<Database>,
        extractor: Arc<dyn TextExtractor>,
    ) -> ServiceResult<Self> {
        for dir in [config.storage.batches_dir(), config.storage.artifacts_dir()] {
            std::fs::create_dir_all(&dir).map_err(ProcessingError::Io)?;
        }

        let ingestion = Arc::new(IngestionService::new(extractor, &config.extraction));
        let i18n = Arc::new(I18n::new(&config.server.default_locale));
        let extraction_permits = Arc::new(Semaphore::new(
            config.limits.max_parallel_extractions.max(1),
        ));

        info!(
            extractor = ingestion.extractor_name(),
            data_dir = %config.storage.data_dir.display(),
            "Statement service initialized"
        );

        Ok(Self {
            config,
            db,
            ingestion,
            i18n,
            extraction_permits,
            generation_locks: DashMap::new(),
        })
    }

    /// Where a batch's uploaded PDFs are stored
    pub fn batch_dir(&self, batch_id: Uuid) -> PathBuf {
        self.config.storage.batches_dir().join(batch_id.to_string())
    }

    /// Where a batch's generated artifacts are written
    pub fn artifact_dir(&self, batch_id: Uuid) -> PathBuf {
        self.config.storage.artifacts_dir().join(batch_id.to_string())
    }
}

/// Remove a directory tree; a missing directory is not an error.
async fn remove_dir_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

//! Batch retention: startup recovery and the periodic cleanup worker.

use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::{StatementService, remove_dir_if_exists};
use crate::error::{ServiceError, ServiceResult, format_error_chain};

const INTERRUPTED_MESSAGE: &str = "ingestion interrupted by a service restart";

impl StatementService {
    /// Fail batches left `ingesting` by a previous process and drop their files.
    pub async fn recover_interrupted_batches(&self) -> ServiceResult<usize> {
        let ids = self.db.fail_stale_ingesting(INTERRUPTED_MESSAGE)?;
        for id in &ids {
            if let Err(e) = remove_dir_if_exists(&self.batch_dir(*id)).await {
                warn!(batch_id = %id, error = %e, "Failed to remove interrupted batch files");
            }
        }
        Ok(ids.len())
    }

    /// Delete batches older than the configured TTL, with their files.
    pub async fn cleanup_expired_batches(&self) -> ServiceResult<usize> {
        let ttl = TimeDelta::from_std(self.config.retention.batch_ttl()).map_err(|e| {
            ServiceError::Config {
                message: format!("Invalid batch TTL: {}", e),
            }
        })?;
        let cutoff = Utc::now() - ttl;

        let expired = self.db.expired_batches(cutoff)?;
        for id in &expired {
            self.delete_batch(*id).await?;
        }

        Ok(expired.len())
    }

    async fn delete_batch(&self, batch_id: Uuid) -> ServiceResult<()> {
        for dir in [self.batch_dir(batch_id), self.artifact_dir(batch_id)] {
            if let Err(e) = remove_dir_if_exists(&dir).await {
                warn!(batch_id = %batch_id, path = %dir.display(), error = %e, "Failed to remove batch directory");
            }
        }

        self.db.delete_batch(batch_id)?;
        self.generation_locks.retain(|(id, _), _| *id != batch_id);

        info!(batch_id = %batch_id, "Expired batch removed");
        Ok(())
    }

    /// Start the retention worker; it stops when `shutdown` is cancelled.
    pub fn start_retention_worker(
        service: Arc<StatementService>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(service.config.retention.cleanup_interval());
            info!("Retention worker started");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        match service.cleanup_expired_batches().await {
                            Ok(count) if count > 0 => info!(removed = count, "Cleaned up expired batches"),
                            Err(e) => warn!(error = %format_error_chain(&e), "Batch cleanup failed"),
                            _ => {}
                        }
                    }
                }
            }

            info!("Retention worker stopped");
        })
    }
}

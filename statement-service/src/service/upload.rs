//! Batch upload: validate, store and extract every document, all or nothing.

use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use metrics::{counter, histogram};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{StatementService, remove_dir_if_exists};
use crate::db::{BatchDocument, IngestedDocument};
use crate::error::{ProcessingError, ServiceError, ServiceResult, format_error_chain};
use crate::ingestion::hash::compute_content_hash;
use crate::ingestion::{Bank, ExtractedDocument, sanitize_filename, sniff_pdf};

const FALLBACK_FILENAME: &str = "document.pdf";

/// One file received in an upload request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Bytes,
}

/// Acknowledgement returned by `/upload`
#[derive(Debug, Clone, Serialize)]
pub struct IngestionSummary {
    pub processed: bool,
    pub batch_id: Uuid,
    pub document_count: usize,
    pub record_count: usize,
    pub documents: Vec<DocumentSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub filename: String,
    pub bank: Bank,
    pub record_count: usize,
}

/// A validated file written to the batch directory
struct StoredFile {
    position: usize,
    filename: String,
    stored_path: String,
    file_hash: String,
    content: Bytes,
}

impl StatementService {
    /// Ingest a batch of statement PDFs.
    ///
    /// Returns only after every document is stored and extracted. Any
    /// failure fails the whole batch and removes what was stored.
    pub async fn ingest_batch(&self, files: Vec<UploadedFile>) -> ServiceResult<IngestionSummary> {
        if files.is_empty() {
            return Err(ServiceError::NoFiles);
        }
        let max = self.config.limits.max_files_per_batch;
        if files.len() > max {
            return Err(ServiceError::TooManyFiles {
                count: files.len(),
                max,
            });
        }

        self.ingest_with_id(Uuid::new_v4(), files).await
    }

    pub(crate) async fn ingest_with_id(
        &self,
        batch_id: Uuid,
        files: Vec<UploadedFile>,
    ) -> ServiceResult<IngestionSummary> {
        self.db.insert_batch(batch_id, Utc::now())?;
        info!(batch_id = %batch_id, files = files.len(), "Batch ingestion started");

        let timeout = self.config.limits.ingestion_timeout();
        let result = match tokio::time::timeout(timeout, self.run_ingestion(batch_id, files)).await
        {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout {
                operation: "ingestion",
                seconds: timeout.as_secs(),
            }),
        };

        match result {
            Ok(summary) => {
                counter!("statements_batches_ingested_total").increment(1);
                counter!("statements_documents_ingested_total")
                    .increment(summary.document_count as u64);
                counter!("statements_records_extracted_total")
                    .increment(summary.record_count as u64);
                info!(
                    batch_id = %batch_id,
                    documents = summary.document_count,
                    records = summary.record_count,
                    "Batch ingested"
                );
                Ok(summary)
            }
            Err(e) => {
                self.abandon_batch(batch_id, &e).await;
                Err(e)
            }
        }
    }

    async fn run_ingestion(
        &self,
        batch_id: Uuid,
        files: Vec<UploadedFile>,
    ) -> ServiceResult<IngestionSummary> {
        let stored = self.store_files(batch_id, files).await?;
        let extracted = self.extract_all(&stored).await?;

        let ingested: Vec<IngestedDocument> = stored
            .into_iter()
            .zip(extracted)
            .map(|(file, document)| IngestedDocument {
                document: BatchDocument {
                    position: file.position,
                    filename: file.filename,
                    stored_path: file.stored_path,
                    file_hash: file.file_hash,
                    size_bytes: file.content.len() as u64,
                    bank: document.bank,
                    statement_year: document.statement_year,
                    record_count: document.movements.len(),
                },
                movements: document.movements,
            })
            .collect();

        self.db.complete_batch(batch_id, &ingested)?;

        let documents: Vec<DocumentSummary> = ingested
            .iter()
            .map(|i| DocumentSummary {
                filename: i.document.filename.clone(),
                bank: i.document.bank,
                record_count: i.document.record_count,
            })
            .collect();

        Ok(IngestionSummary {
            processed: true,
            batch_id,
            document_count: documents.len(),
            record_count: documents.iter().map(|d| d.record_count).sum(),
            documents,
        })
    }

    /// Validate and write every file, in upload order.
    async fn store_files(
        &self,
        batch_id: Uuid,
        files: Vec<UploadedFile>,
    ) -> ServiceResult<Vec<StoredFile>> {
        let dir = self.batch_dir(batch_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(ProcessingError::Io)?;

        let max_size = self.config.limits.max_document_size_bytes;
        let mut stored = Vec::with_capacity(files.len());

        for (position, file) in files.into_iter().enumerate() {
            let size = file.content.len() as u64;
            if size > max_size {
                return Err(ProcessingError::FileTooLarge {
                    filename: file.filename,
                    size,
                    max: max_size,
                }
                .into());
            }

            if !sniff_pdf(&file.content) {
                return Err(ServiceError::NotAPdf {
                    filename: file.filename,
                });
            }

            let safe_name = match sanitize_filename(&file.filename) {
                name if name.is_empty() => FALLBACK_FILENAME.to_string(),
                name => name,
            };
            let path = dir.join(format!("{:03}_{}", position, safe_name));
            tokio::fs::write(&path, &file.content)
                .await
                .map_err(ProcessingError::Io)?;

            debug!(batch_id = %batch_id, path = %path.display(), size, "Stored document");

            stored.push(StoredFile {
                position,
                file_hash: compute_content_hash(&file.content),
                stored_path: path.to_string_lossy().to_string(),
                filename: file.filename,
                content: file.content,
            });
        }

        Ok(stored)
    }

    /// Extract all documents in parallel on the blocking pool and wait for
    /// every one. The first failure in upload order is reported.
    async fn extract_all(&self, stored: &[StoredFile]) -> ServiceResult<Vec<ExtractedDocument>> {
        let tasks = stored.iter().map(|file| {
            let ingestion = self.ingestion.clone();
            let permits = self.extraction_permits.clone();
            let filename = file.filename.clone();
            let content = file.content.clone();

            async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| ServiceError::Internal {
                        message: format!("Extraction pool closed: {}", e),
                    })?;

                let started = Instant::now();
                let result = tokio::task::spawn_blocking(move || {
                    ingestion.extract_document(&filename, &content)
                })
                .await
                .map_err(ProcessingError::Join)?;

                histogram!("statements_extraction_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                result
            }
        });

        join_all(tasks).await.into_iter().collect()
    }

    /// Mark a batch failed and drop its stored files.
    async fn abandon_batch(&self, batch_id: Uuid, error: &ServiceError) {
        counter!("statements_batches_failed_total").increment(1);
        warn!(batch_id = %batch_id, error = %format_error_chain(error), "Batch ingestion failed");

        if let Err(e) = self.db.fail_batch(batch_id, &format_error_chain(error)) {
            warn!(batch_id = %batch_id, error = %format_error_chain(&e), "Failed to mark batch failed");
        }
        if let Err(e) = remove_dir_if_exists(&self.batch_dir(batch_id)).await {
            warn!(batch_id = %batch_id, error = %e, "Failed to remove batch files");
        }
    }
}

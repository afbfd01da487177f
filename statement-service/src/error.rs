use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::i18n::I18n;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No files were provided")]
    NoFiles,

    #[error("Too many files: {count} (max {max})")]
    TooManyFiles { count: usize, max: usize },

    #[error("Not a PDF document: {filename}")]
    NotAPdf { filename: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unsupported file type: {file_type}")]
    InvalidFormat { file_type: String },

    #[error("Batch not found: {batch_id}")]
    BatchNotFound { batch_id: String },

    #[error("Batch {batch_id} has not completed (status: {status})")]
    BatchIncomplete { batch_id: String, status: String },

    #[error("Artifact not found: {path}")]
    ArtifactNotFound { path: String },

    #[error("Failed to parse {filename}: {source}")]
    Parse {
        filename: String,
        #[source]
        source: ParseError,
    },

    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("Database error")]
    Database(#[from] DatabaseError),

    #[error("Document processing failed")]
    Processing(#[from] ProcessingError),

    #[error("Artifact rendering failed")]
    Export(#[from] ExportError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Statement parsing errors, raised per document
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("PDF could not be opened: {message}")]
    MalformedPdf { message: String },

    #[error("no text could be extracted")]
    NoText,

    #[error("bank not recognized")]
    UnrecognizedBank,
}

/// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed")]
    Connection(#[source] rusqlite::Error),

    #[error("Query failed")]
    Query(#[source] rusqlite::Error),

    #[error("Migration failed: {message}")]
    Migration { message: String },
}

/// Document storage and extraction errors
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Failed to load PDF library: {message}")]
    PdfLibrary { message: String },

    #[error("File too large: {filename} is {size} bytes (max {max} bytes)")]
    FileTooLarge {
        filename: String,
        size: u64,
        max: u64,
    },

    #[error("Extraction task failed")]
    Join(#[source] tokio::task::JoinError),

    #[error("IO error")]
    Io(#[source] std::io::Error),
}

/// Artifact rendering errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Spreadsheet rendering failed")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("Delimited text rendering failed")]
    Delimited(#[from] csv::Error),

    #[error("Failed to flush delimited output")]
    Flush(#[source] std::io::Error),
}

/// Coarse error classification exposed to clients as `code`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Parse,
    InvalidFormat,
    NotFound,
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Parse => "parse_error",
            ErrorKind::InvalidFormat => "invalid_format",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal_error",
        }
    }
}

/// API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NoFiles
            | ServiceError::TooManyFiles { .. }
            | ServiceError::NotAPdf { .. }
            | ServiceError::InvalidRequest { .. }
            | ServiceError::Processing(ProcessingError::FileTooLarge { .. }) => {
                ErrorKind::Validation
            }
            ServiceError::Parse { .. } => ErrorKind::Parse,
            ServiceError::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            ServiceError::BatchNotFound { .. }
            | ServiceError::BatchIncomplete { .. }
            | ServiceError::ArtifactNotFound { .. } => ErrorKind::NotFound,
            ServiceError::Timeout { .. } => ErrorKind::Timeout,
            ServiceError::Database(_)
            | ServiceError::Processing(_)
            | ServiceError::Export(_)
            | ServiceError::Config { .. }
            | ServiceError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Processing(ProcessingError::FileTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            _ => match self.kind() {
                ErrorKind::Validation | ErrorKind::InvalidFormat => StatusCode::BAD_REQUEST,
                ErrorKind::Parse => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Machine-readable specifics for the response body
    pub fn details(&self) -> Option<serde_json::Value> {
        use serde_json::json;

        match self {
            ServiceError::NoFiles => Some(json!({ "reason": "no_files" })),
            ServiceError::TooManyFiles { count, max } => {
                Some(json!({ "reason": "too_many_files", "count": count, "max": max }))
            }
            ServiceError::NotAPdf { filename } => {
                Some(json!({ "reason": "not_a_pdf", "filename": filename }))
            }
            ServiceError::Processing(ProcessingError::FileTooLarge { filename, size, max }) => {
                Some(json!({ "reason": "file_too_large", "filename": filename, "size": size, "max": max }))
            }
            ServiceError::InvalidFormat { file_type } => {
                Some(json!({ "file_type": file_type, "supported": ["excel", "csv", "txt"] }))
            }
            ServiceError::BatchNotFound { batch_id } => {
                Some(json!({ "reason": "missing", "batch_id": batch_id }))
            }
            ServiceError::BatchIncomplete { batch_id, status } => {
                Some(json!({ "reason": "incomplete", "batch_id": batch_id, "status": status }))
            }
            ServiceError::Parse { filename, source } => {
                let reason = match source {
                    ParseError::MalformedPdf { .. } => "malformed_pdf",
                    ParseError::NoText => "no_text",
                    ParseError::UnrecognizedBank => "unrecognized_bank",
                };
                Some(json!({ "reason": reason, "filename": filename }))
            }
            ServiceError::Timeout { operation, seconds } => {
                Some(json!({ "operation": operation, "seconds": seconds }))
            }
            _ => None,
        }
    }

    /// Get a user-facing translated message
    pub fn user_message(&self, i18n: &I18n, locale: &str) -> String {
        match self {
            ServiceError::NoFiles => i18n.get(locale, "error-no-files", None),
            ServiceError::TooManyFiles { count, max } => i18n.format(
                locale,
                "error-too-many-files",
                &[("count", &count.to_string()), ("max", &max.to_string())],
            ),
            ServiceError::NotAPdf { filename } => {
                i18n.format(locale, "error-not-a-pdf", &[("filename", filename)])
            }
            ServiceError::Processing(ProcessingError::FileTooLarge { filename, .. }) => {
                i18n.format(locale, "error-file-too-large", &[("filename", filename)])
            }
            ServiceError::InvalidFormat { file_type } => {
                i18n.format(locale, "error-invalid-format", &[("file_type", file_type)])
            }
            ServiceError::BatchNotFound { batch_id }
            | ServiceError::BatchIncomplete { batch_id, .. } => {
                i18n.format(locale, "error-batch-not-found", &[("id", batch_id)])
            }
            ServiceError::ArtifactNotFound { .. } => {
                i18n.get(locale, "error-artifact-not-found", None)
            }
            ServiceError::Parse {
                filename,
                source: ParseError::UnrecognizedBank,
            } => i18n.format(locale, "error-unrecognized-bank", &[("filename", filename)]),
            ServiceError::Parse { filename, .. } => {
                i18n.format(locale, "error-parse", &[("filename", filename)])
            }
            ServiceError::Timeout { .. } => i18n.get(locale, "error-timeout", None),
            ServiceError::Database(_)
            | ServiceError::Processing(_)
            | ServiceError::Export(_)
            | ServiceError::Internal { .. } => i18n.get(locale, "error-internal", None),
            // For other errors, fall back to the technical message
            _ => self.to_string(),
        }
    }

    fn log(&self) {
        if self.kind() == ErrorKind::Internal {
            tracing::error!(error = %format_error_chain(self), "Request failed");
        } else {
            tracing::debug!(error = %format_error_chain(self), "Request rejected");
        }
    }

    /// Convert to an error response with i18n support
    pub fn into_response_with_i18n(self, i18n: &I18n, locale: &str) -> Response {
        self.log();

        let response = ErrorResponse {
            message: self.user_message(i18n, locale),
            code: self.kind().as_str().to_string(),
            details: self.details(),
        };

        (self.status_code(), Json(response)).into_response()
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        self.log();

        let response = ErrorResponse {
            message: self.to_string(),
            code: self.kind().as_str().to_string(),
            details: self.details(),
        };

        (self.status_code(), Json(response)).into_response()
    }
}

/// Render an error and all of its sources as `outer: inner: ...`
pub fn format_error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error wrapper with i18n support for API responses
pub struct I18nError {
    pub error: ServiceError,
    pub i18n: Arc<I18n>,
    pub locale: String,
}

impl I18nError {
    pub fn new(error: ServiceError, i18n: Arc<I18n>, locale: impl Into<String>) -> Self {
        Self {
            error,
            i18n,
            locale: locale.into(),
        }
    }
}

impl IntoResponse for I18nError {
    fn into_response(self) -> Response {
        self.error.into_response_with_i18n(&self.i18n, &self.locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_distinguish_format_from_missing_batch() {
        let format = ServiceError::InvalidFormat {
            file_type: "pdf".to_string(),
        };
        let missing = ServiceError::BatchNotFound {
            batch_id: "abc".to_string(),
        };

        assert_eq!(format.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(format.kind().as_str(), "invalid_format");
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.kind().as_str(), "not_found");
    }

    #[test]
    fn test_file_too_large_is_validation_with_413() {
        let error = ServiceError::Processing(ProcessingError::FileTooLarge {
            filename: "big.pdf".to_string(),
            size: 10,
            max: 5,
        });
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_parse_details_name_the_reason() {
        let error = ServiceError::Parse {
            filename: "enero.pdf".to_string(),
            source: ParseError::UnrecognizedBank,
        };
        let details = error.details().unwrap();
        assert_eq!(details["reason"], "unrecognized_bank");
        assert_eq!(details["filename"], "enero.pdf");
        assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_format_error_chain() {
        let error = ServiceError::Processing(ProcessingError::Io(std::io::Error::other("disk full")));
        assert_eq!(
            format_error_chain(&error),
            "Document processing failed: IO error: disk full"
        );
    }
}

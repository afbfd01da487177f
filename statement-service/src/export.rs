//! Rendering a batch's records into a downloadable artifact.

pub mod delimited;
pub mod xlsx;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::db::{BatchDocument, StatementRecord};
use crate::error::{ExportError, ServiceError, ServiceResult};
use crate::ingestion::{Amount, Direction};

/// URL and directory prefix under which artifacts are served
pub const ARTIFACTS_PREFIX: &str = "artifacts";

/// Base name of every generated artifact
pub const ARTIFACT_STEM: &str = "movimientos_combinados";

/// Output columns, in order
pub const HEADERS: [&str; 6] = [
    "fecha",
    "referencia",
    "deposito",
    "retiro",
    "descripcion",
    "saldo_operacion",
];

const MISSING_REFERENCE: &str = "N/A";
const MISSING_DESCRIPTION: &str = "Sin descripcion";

/// Requested artifact format (`file_type` query parameter)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    Excel,
    Csv,
    Txt,
}

impl OutputFormat {
    /// Parse a client-supplied `file_type`, case-insensitively.
    pub fn parse(value: &str) -> ServiceResult<Self> {
        OutputFormat::from_str(value.trim()).map_err(|_| ServiceError::InvalidFormat {
            file_type: value.to_string(),
        })
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Excel => "xlsx",
            OutputFormat::Csv => "csv",
            OutputFormat::Txt => "txt",
        }
    }

    pub fn content_type(self) -> mime::Mime {
        match self {
            OutputFormat::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                .parse()
                .unwrap_or(mime::APPLICATION_OCTET_STREAM),
            OutputFormat::Csv => mime::TEXT_CSV_UTF_8,
            OutputFormat::Txt => mime::TEXT_PLAIN_UTF_8,
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.{}", ARTIFACT_STEM, self.extension())
    }

    /// Render the artifact bytes
    pub fn render(
        self,
        created_at: DateTime<Utc>,
        sheets: &[DocumentRows],
    ) -> Result<Vec<u8>, ExportError> {
        match self {
            OutputFormat::Excel => xlsx::render(created_at, sheets),
            OutputFormat::Csv => delimited::render(b',', sheets),
            OutputFormat::Txt => delimited::render(b'\t', sheets),
        }
    }
}

/// `artifacts/{batch_id}/{file_name}`
pub fn artifact_relative_path(batch_id: Uuid, file_name: &str) -> String {
    format!("{}/{}/{}", ARTIFACTS_PREFIX, batch_id, file_name)
}

/// One output line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub fecha: String,
    pub referencia: String,
    pub deposito: Amount,
    pub retiro: Amount,
    pub descripcion: String,
    pub saldo_operacion: Option<Amount>,
}

impl From<&StatementRecord> for OutputRow {
    fn from(record: &StatementRecord) -> Self {
        let (deposito, retiro) = match record.direction {
            Direction::Deposit => (record.amount, Amount::ZERO),
            Direction::Withdrawal => (Amount::ZERO, record.amount),
        };

        let descripcion = record.description.trim();

        Self {
            fecha: record.operation_date.format("%d/%m/%Y").to_string(),
            referencia: record
                .reference
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(MISSING_REFERENCE)
                .to_string(),
            deposito,
            retiro,
            descripcion: if descripcion.is_empty() {
                MISSING_DESCRIPTION.to_string()
            } else {
                descripcion.to_string()
            },
            saldo_operacion: record.balance,
        }
    }
}

/// Rows of one source document; becomes a worksheet in spreadsheets
#[derive(Debug, Clone)]
pub struct DocumentRows {
    pub filename: String,
    pub rows: Vec<OutputRow>,
}

/// Group records under their documents, keeping upload order.
pub fn group_rows(documents: &[BatchDocument], records: &[StatementRecord]) -> Vec<DocumentRows> {
    let mut documents: Vec<&BatchDocument> = documents.iter().collect();
    documents.sort_by_key(|d| d.position);

    documents
        .into_iter()
        .map(|document| DocumentRows {
            filename: document.filename.clone(),
            rows: records
                .iter()
                .filter(|r| r.document_position == document.position)
                .map(OutputRow::from)
                .collect(),
        })
        .collect()
}

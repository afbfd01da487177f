//! Statement extraction: PDF text → bank detection → movement lines →
//! classified movements.

pub mod amount;
pub mod banks;
pub mod dates;
pub mod hash;
pub mod pdf;
pub mod text;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, info, warn};

pub use amount::Amount;
pub use banks::{Bank, ParsedLine};
pub use pdf::PdfiumTextExtractor;

use crate::config::ExtractionConfig;
use crate::error::{ParseError, ServiceError, ServiceResult};

/// PDF magic bytes; must appear within the first [`SNIFF_WINDOW`] bytes.
const PDF_MAGIC: &[u8] = b"%PDF-";
const SNIFF_WINDOW: usize = 1024;

/// Whether money entered or left the account
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Deposit,
    Withdrawal,
}

/// One classified statement movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movement {
    pub operation_date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub amount: Amount,
    pub balance: Option<Amount>,
    pub direction: Direction,
}

/// Everything read from one statement
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub bank: Bank,
    pub statement_year: i32,
    pub movements: Vec<Movement>,
}

/// Source of plain text for a stored PDF.
///
/// Implementations are called from the blocking thread pool.
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Text of every page, joined with `\n`.
    fn extract_text(&self, filename: &str, content: &[u8]) -> ServiceResult<String>;
}

/// Decides deposit vs. withdrawal for a parsed line.
#[derive(Debug, Clone)]
pub struct DirectionClassifier {
    deposit_keywords: Vec<String>,
}

impl DirectionClassifier {
    pub fn new(deposit_keywords: &[String]) -> Self {
        Self {
            deposit_keywords: deposit_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// The running balance wins when it moved by exactly the amount;
    /// otherwise the description keywords decide.
    pub fn classify(&self, previous_balance: Option<Amount>, line: &ParsedLine) -> Direction {
        if let (Some(previous), Some(current)) = (previous_balance, line.balance) {
            let delta = current - previous;
            if delta == line.amount {
                return Direction::Deposit;
            }
            if delta == line.amount.neg() {
                return Direction::Withdrawal;
            }
        }

        let description = line.description.to_lowercase();
        if self
            .deposit_keywords
            .iter()
            .any(|keyword| description.contains(keyword.as_str()))
        {
            Direction::Deposit
        } else {
            Direction::Withdrawal
        }
    }
}

/// Content sniffing; the filename is never trusted.
pub fn sniff_pdf(content: &[u8]) -> bool {
    let window = &content[..content.len().min(SNIFF_WINDOW)];
    window
        .windows(PDF_MAGIC.len())
        .any(|candidate| candidate == PDF_MAGIC)
}

/// Statement extraction service
pub struct IngestionService {
    extractor: Arc<dyn TextExtractor>,
    default_year: Option<i32>,
    classifier: DirectionClassifier,
}

impl IngestionService {
    pub fn new(extractor: Arc<dyn TextExtractor>, config: &ExtractionConfig) -> Self {
        Self {
            extractor,
            default_year: config.default_year,
            classifier: DirectionClassifier::new(&config.deposit_keywords),
        }
    }

    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }

    /// Extract the movements of one stored PDF. Blocking.
    pub fn extract_document(&self, filename: &str, content: &[u8]) -> ServiceResult<ExtractedDocument> {
        let text = self.extractor.extract_text(filename, content)?;
        self.parse_statement(filename, &text)
    }

    /// Parse statement text already pulled out of a PDF.
    pub fn parse_statement(&self, filename: &str, text: &str) -> ServiceResult<ExtractedDocument> {
        if text.trim().is_empty() {
            return Err(ServiceError::Parse {
                filename: filename.to_string(),
                source: ParseError::NoText,
            });
        }

        let bank = Bank::detect(text).ok_or_else(|| ServiceError::Parse {
            filename: filename.to_string(),
            source: ParseError::UnrecognizedBank,
        })?;

        let statement_year = dates::detect_statement_year(text)
            .or(self.default_year)
            .unwrap_or_else(|| Utc::now().year());

        debug!(filename, %bank, statement_year, "Parsing statement");

        let lines = bank.parse_lines(text, statement_year);
        let mut previous_balance = None;
        let movements: Vec<Movement> = lines
            .into_iter()
            .map(|line| {
                let direction = self.classifier.classify(previous_balance, &line);
                if line.balance.is_some() {
                    previous_balance = line.balance;
                }
                Movement {
                    operation_date: line.operation_date,
                    description: line.description,
                    reference: line.reference,
                    amount: line.amount,
                    balance: line.balance,
                    direction,
                }
            })
            .collect();

        if movements.is_empty() {
            warn!(filename, %bank, "Statement yielded no movements");
        } else {
            info!(filename, %bank, movements = movements.len(), "Statement parsed");
        }

        Ok(ExtractedDocument {
            bank,
            statement_year,
            movements,
        })
    }
}

/// Sanitize a string for use as a filename
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches(|c| c == '_' || c == '.')
        .to_string()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Statement fixtures and a text extractor that needs no PDFium.

    use super::*;

    pub const SCOTIABANK_STATEMENT: &str = "Scotiabank Inverlat S.A.\n\
        Periodo: 01 ENE 2024 al 31 ENE 2024\n\
        Detalle de tus movimientos\n\
        Fecha Concepto Origen/Referencia Deposito Retiro Saldo\n\
        05 ENE SPEI RECIBIDO\n\
        NOMINA EMPRESA 0012345 $15,000.00 $20,000.00\n\
        08 ENE PAGO TARJETA CREDITO 0098765 $2,500.00 $17,500.00\n\
        LAS TASAS DE INTERES ESTAN EXPRESADAS EN TERMINOS ANUALES SIMPLES.\n";

    pub const BBVA_STATEMENT: &str = "BBVA Bancomer\n\
        Periodo DEL 01/FEB/2024 AL 29/FEB/2024\n\
        Detalle de Movimientos Realizados\n\
        02/FEB 02/FEB SPEI RECIBIDO BANORTE 1,250.00 11,250.00 11,250.00\n\
        05/FEB 05/FEB PAGO TARJETA OXXO 300.50 10,949.50 10,949.50\n\
        Total de Movimientos\n";

    /// Build an upload body the stub understands: PDF magic, then statement text.
    pub fn fake_pdf(text: &str) -> Vec<u8> {
        let mut content = b"%PDF-1.4\n".to_vec();
        content.extend_from_slice(text.as_bytes());
        content
    }

    /// Treats everything after the first line as the page text.
    pub struct StubExtractor;

    impl TextExtractor for StubExtractor {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn extract_text(&self, _filename: &str, content: &[u8]) -> ServiceResult<String> {
            let text = String::from_utf8_lossy(content);
            Ok(text
                .split_once('\n')
                .map(|(_, rest)| rest.to_string())
                .unwrap_or_default())
        }
    }

    pub fn service() -> IngestionService {
        IngestionService::new(Arc::new(StubExtractor), &ExtractionConfig::default())
    }
}

//! PDF text extraction backed by PDFium.

use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::TextExtractor;
use crate::error::{ParseError, ProcessingError, ServiceError, ServiceResult};

/// Create a new Pdfium instance (dynamically linked).
///
/// Searches for libpdfium in:
/// 1. Current directory (./libpdfium.so)
/// 2. vendor/pdfium/lib/
/// 3. System library paths
pub fn create_pdfium() -> Result<Pdfium, ProcessingError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "./vendor/pdfium/lib/",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| ProcessingError::PdfLibrary {
            message: format!("Failed to load PDFium library, install libpdfium: {:?}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Production extractor. Binds PDFium per call; the bindings are not
/// shared across the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumTextExtractor;

impl TextExtractor for PdfiumTextExtractor {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn extract_text(&self, filename: &str, content: &[u8]) -> ServiceResult<String> {
        let pdfium = create_pdfium()?;

        let malformed = |message: String| ServiceError::Parse {
            filename: filename.to_string(),
            source: ParseError::MalformedPdf { message },
        };

        let document = pdfium
            .load_pdf_from_byte_slice(content, None)
            .map_err(|e| malformed(format!("Failed to load PDF: {:?}", e)))?;

        let page_count = document.pages().len();
        let mut pages = Vec::with_capacity(usize::from(page_count));

        for (page_index, page) in document.pages().iter().enumerate() {
            let text = page.text().map_err(|e| {
                warn!(filename, page = page_index + 1, error = ?e, "Failed to get text object for page");
                malformed(format!("Failed to extract text from page {}: {:?}", page_index + 1, e))
            })?;
            pages.push(text.all());
        }

        debug!(filename, pages = page_count, "PDF text extracted");

        Ok(pages.join("\n"))
    }
}

//! Format dispatch and the extraction result type.
//!
//! [`Dispatcher`] owns one instance of every extractor and routes a buffer to
//! the right one by [`DocumentFormat::detect`]. Unrecognised formats are
//! decoded as plain text; dispatch itself never fails.

mod format;

pub use format::DocumentFormat;

use anyhow::Result;
use serde::Serialize;

use crate::config::Settings;
use crate::container::ContainerExtractor;
use crate::pdf::PdfExtractor;
use crate::text::{decode_plain_text, Normalizer};

/// Stored for buffers below the empty-file threshold
pub const EMPTY_FILE_SENTINEL: &str = "[This file appears to be empty]";

/// Stored for PDFs carrying an encryption dictionary
pub const ENCRYPTED_PDF_SENTINEL: &str = "[This PDF is password-protected and cannot be extracted]";

/// Stored for image-only PDFs with almost no recoverable text
pub const SCANNED_PDF_SENTINEL: &str =
    "[This appears to be a scanned document. OCR processing required.]";

/// How the text was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Recovered from the document's own text encoding
    Text,
    /// Produced by optical character recognition (never by this crate)
    Ocr,
    /// Sentinel or lenient decoding of an unrecognised format
    Fallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Ocr => "ocr",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub text: String,
    /// Always at least 1
    pub page_count: usize,
    pub method: ExtractionMethod,
    pub is_scanned: bool,
}

impl ExtractionResult {
    /// Result for a buffer too short to hold a document.
    pub fn empty_file() -> Self {
        Self {
            text: EMPTY_FILE_SENTINEL.to_string(),
            page_count: 1,
            method: ExtractionMethod::Fallback,
            is_scanned: false,
        }
    }
}

/// Routes buffers to the extractor for their format.
pub struct Dispatcher {
    normalizer: Normalizer,
    pdf: PdfExtractor,
    container: ContainerExtractor,
}

impl Dispatcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_pdf_extractor(settings, PdfExtractor::new(settings.pdf.clone())?)
    }

    /// Build a dispatcher around a preconfigured PDF extractor.
    pub fn with_pdf_extractor(settings: &Settings, pdf: PdfExtractor) -> Result<Self> {
        Ok(Self {
            normalizer: Normalizer::new()?,
            pdf,
            container: ContainerExtractor::new(settings.container.clone())?,
        })
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Extract text from `bytes`, declared as `declared_type` and stored at `path`.
    pub fn extract(&self, bytes: &[u8], declared_type: &str, path: &str) -> ExtractionResult {
        let format = DocumentFormat::detect(bytes, declared_type, path);
        tracing::debug!(?format, declared_type, size = bytes.len(), "Dispatching extraction");

        match format {
            DocumentFormat::Pdf => self.pdf.extract(bytes, &self.normalizer),
            DocumentFormat::WordProcessor => self.container.extract_document(bytes, &self.normalizer),
            DocumentFormat::SlideDeck => self.container.extract_slides(bytes, &self.normalizer),
            DocumentFormat::PlainText => self.plain_text(bytes, ExtractionMethod::Text),
            DocumentFormat::Unknown => self.plain_text(bytes, ExtractionMethod::Fallback),
        }
    }

    fn plain_text(&self, bytes: &[u8], method: ExtractionMethod) -> ExtractionResult {
        ExtractionResult {
            text: self.normalizer.normalize(&decode_plain_text(bytes)),
            page_count: 1,
            method,
            is_scanned: false,
        }
    }
}

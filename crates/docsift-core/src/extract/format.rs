//! Format detection from the declared type, the storage path, and the bytes.

use serde::Serialize;

use crate::pdf::strategies::find;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Which extractor a buffer is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    WordProcessor,
    SlideDeck,
    PlainText,
    /// Not recognised; decoded as plain text
    Unknown,
}

impl DocumentFormat {
    /// Decide the format. First match wins: PDF, word processor, slide deck,
    /// plain text. Declared type and file extension are checked first; the
    /// bytes are sniffed only for PDF magic or when nothing else matched.
    /// Legacy `doc`/`ppt` declarations fall to `Unknown` unless the bytes
    /// are a zip container.
    pub fn detect(bytes: &[u8], declared_type: &str, path: &str) -> Self {
        let declared = declared_type.trim().to_ascii_lowercase();
        let ext = extension(path);
        let ext = ext.as_deref().unwrap_or("");

        if declared.contains("pdf") || ext == "pdf" || bytes.starts_with(b"%PDF-") {
            return Self::Pdf;
        }

        let is_zip = bytes.starts_with(ZIP_MAGIC);

        if declared == "docx" || declared.contains("wordprocessingml") || ext == "docx" {
            return Self::WordProcessor;
        }
        if declared == "doc" || declared.contains("msword") || ext == "doc" {
            return Self::legacy(is_zip, Self::WordProcessor);
        }
        if declared == "pptx" || declared.contains("presentationml") || ext == "pptx" {
            return Self::SlideDeck;
        }
        if declared == "ppt" || declared.contains("powerpoint") || ext == "ppt" {
            return Self::legacy(is_zip, Self::SlideDeck);
        }
        if matches!(declared.as_str(), "txt" | "text")
            || declared.starts_with("text/")
            || matches!(ext, "txt" | "md" | "csv")
        {
            return Self::PlainText;
        }

        if is_zip {
            if find(bytes, b"word/document.xml").is_some() {
                return Self::WordProcessor;
            }
            if find(bytes, b"ppt/slides/").is_some() {
                return Self::SlideDeck;
            }
        }

        Self::Unknown
    }

    /// Legacy binary office files are not zip containers; only a mislabelled
    /// zip goes to the container extractor.
    fn legacy(is_zip: bool, container: Self) -> Self {
        if is_zip {
            container
        } else {
            Self::Unknown
        }
    }
}

fn extension(path: &str) -> Option<String> {
    let file_name = path.rsplit('/').next()?;
    let (_, ext) = file_name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

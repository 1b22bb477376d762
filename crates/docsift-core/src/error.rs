use thiserror::Error;

/// Terminal failures of one ingestion run.
///
/// Empty files, encrypted PDFs and unknown formats are not errors; they
/// complete with a sentinel or a fallback decode.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to download file: {0}")]
    Download(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Metadata store error: {0:#}")]
    Store(anyhow::Error),
}

impl From<anyhow::Error> for IngestError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(err)
    }
}

impl IngestError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidRequest(_) => 400,
            Self::Download(_) | Self::Extraction(_) | Self::Store(_) => 500,
        }
    }

    /// Short message for API clients
    pub fn summary(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Document not found",
            Self::InvalidRequest(_) => "Invalid request",
            Self::Download(_) => "Failed to download file",
            Self::Extraction(_) => "Failed to process document",
            Self::Store(_) => "Internal error",
        }
    }

    /// Underlying detail, when there is one beyond the summary
    pub fn details(&self) -> Option<String> {
        match self {
            Self::NotFound(_) => None,
            Self::InvalidRequest(detail) | Self::Download(detail) | Self::Extraction(detail) => {
                Some(detail.clone())
            }
            Self::Store(err) => Some(format!("{:#}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(IngestError::NotFound("d".into()).status_code(), 404);
        assert_eq!(IngestError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(IngestError::Download("x".into()).status_code(), 500);
        assert_eq!(IngestError::Extraction("x".into()).status_code(), 500);
        assert_eq!(IngestError::from(anyhow::anyhow!("db")).status_code(), 500);
    }

    #[test]
    fn test_details() {
        assert_eq!(IngestError::NotFound("d".into()).details(), None);
        assert_eq!(
            IngestError::Download("permission denied".into()).details().as_deref(),
            Some("permission denied")
        );
    }
}

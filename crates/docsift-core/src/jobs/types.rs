//! Outcome types for the ingestion pipeline.

use serde::Serialize;

use crate::extract::ExtractionMethod;

/// Result of one successful ingestion call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ProcessOutcome {
    /// The document was already completed; nothing was downloaded
    AlreadyProcessed,
    /// Another invocation holds the processing claim
    AlreadyProcessing,
    /// Extraction ran and the document row was completed
    Completed(ExtractionSummary),
}

impl ProcessOutcome {
    /// Message for the short-circuit outcomes
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::AlreadyProcessed => Some("Already processed"),
            Self::AlreadyProcessing => Some("Already processing"),
            Self::Completed(_) => None,
        }
    }
}

/// What was stored for a completed document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSummary {
    pub text_length: usize,
    pub page_count: usize,
    pub method: ExtractionMethod,
    pub is_scanned: bool,
    /// Text was cut at the character cap
    pub truncated: bool,
}

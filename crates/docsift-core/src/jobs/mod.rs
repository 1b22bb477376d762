//! Document ingestion pipeline.
//!
//! Architecture:
//!
//! ```text
//! Ingestor::process(document_id)
//!         │
//!         ▼
//!  load row ──► completed? ──► "Already processed"
//!         │
//!         ▼
//!  claim processing (compare-and-set) ──► lost? ──► "Already processing"
//!         │
//!         ▼
//!  download bytes ──► error ──► mark failed
//!         │
//!         ▼
//!  empty file? ──► complete with sentinel
//!         │
//!         ▼
//!  Dispatcher::extract (blocking pool) ──► panic ──► mark failed
//!         │
//!         ▼
//!  truncate, mark completed
//! ```
//!
//! Each step writes a best-effort audit entry. Audit write failures are
//! logged and never abort the run.

mod ingest;
mod types;

pub use ingest::{Ingestor, HAS_TEXT_MIN_CHARS};
pub use types::{ExtractionSummary, ProcessOutcome};

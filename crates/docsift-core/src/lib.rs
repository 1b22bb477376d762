//! Docsift Core - Heuristic text extraction for uploaded documents
//!
//! This crate contains all the core functionality for docsift, including:
//! - PDF text recovery from raw bytes (no conformant parser)
//! - Word-processor and slide-deck harvesting from OOXML containers
//! - Plain-text decoding and normalization
//! - The ingestion pipeline that records outcomes against document rows
//! - SQLite metadata store and filesystem object store

pub mod config;
pub mod container;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod pdf;
pub mod storage;
pub mod text;

use std::sync::Arc;

pub use config::{Config, Settings};
pub use error::IngestError;
pub use extract::{Dispatcher, DocumentFormat, ExtractionMethod, ExtractionResult};
pub use jobs::{ExtractionSummary, Ingestor, ProcessOutcome};
pub use storage::{DocumentStore, FsObjectStore, ObjectStore, SqliteDocumentStore};

/// Application state shared across request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ingestor: Ingestor,
}

impl AppState {
    /// Open the local stores described by `config` and build the pipeline.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let settings = Settings::load(&config.settings_file);
        let documents = Arc::new(SqliteDocumentStore::open(&config.database_file)?);
        let objects = Arc::new(FsObjectStore::new(&config.objects_dir));
        let ingestor = Ingestor::new(documents, objects, settings)?;

        tracing::debug!(
            database = ?config.database_file,
            objects = ?config.objects_dir,
            "Local stores opened"
        );

        Ok(Self { config, ingestor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_app_state_opens_local_stores() {
        let dir = tempdir().unwrap();
        let config = Config::with_data_dir(dir.path().to_path_buf(), "127.0.0.1:0".into());
        config.ensure_dirs().unwrap();

        let state = AppState::new(config).unwrap();
        assert!(state.config.database_file.exists());
        assert_eq!(state.ingestor.settings(), &Settings::default());
    }
}

//! Collaborator interfaces for the ingestion pipeline and their local
//! implementations.
//!
//! [`ObjectStore`] provides document bytes by storage path. [`DocumentStore`]
//! holds document rows and the audit log. Both are injected into
//! [`Ingestor`](crate::jobs::Ingestor) so tests and deployments can swap them.

mod sqlite;

pub use sqlite::{NewDocument, SqliteDocumentStore};

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a document's extraction job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A document row as read from the metadata store
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub id: String,
    pub storage_path: String,
    /// Declared file type; may be a short name, an extension or a MIME type
    pub file_type: String,
    pub owner_id: String,
    pub extraction_status: ExtractionStatus,
    pub extracted_text: Option<String>,
    pub has_text: bool,
    pub text_length: usize,
    pub page_count: Option<usize>,
    pub processing_error: Option<String>,
}

/// Fields written when extraction completes
#[derive(Debug, Clone)]
pub struct CompletedExtraction {
    pub text: String,
    pub has_text: bool,
    pub text_length: usize,
    pub page_count: usize,
}

/// Audit log actions emitted by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Started,
    FileDownloaded,
    Completed,
    Failed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::FileDownloaded => "file_downloaded",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "started" => Some(Self::Started),
            "file_downloaded" => Some(Self::FileDownloaded),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One audit log row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub document_id: String,
    pub user_id: String,
    pub action: AuditAction,
    pub details: serde_json::Value,
}

/// Download-by-path access to stored files
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download(&self, path: &str) -> Result<Vec<u8>>;
}

/// Document rows and the audit log
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document that has not been soft-deleted.
    async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>>;

    /// Move the document to `processing` if its status is still `expected`.
    /// Returns false when another writer changed it first.
    async fn claim_processing(&self, id: &str, expected: ExtractionStatus) -> Result<bool>;

    async fn mark_completed(&self, id: &str, extraction: &CompletedExtraction) -> Result<()>;

    async fn mark_failed(&self, id: &str, error: &str) -> Result<()>;

    async fn insert_audit_log(&self, entry: &AuditEntry) -> Result<()>;
}

/// Object store over a local directory
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a storage path below the root. Absolute paths and `..`
    /// components are rejected.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if path.is_empty() {
            bail!("Empty storage path");
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => bail!("Storage path escapes the object root: {}", path),
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full)
            .await
            .with_context(|| format!("Failed to read object {}", path))
    }
}

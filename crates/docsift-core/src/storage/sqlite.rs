use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    AuditAction, AuditEntry, CompletedExtraction, DocumentRecord, DocumentStore, ExtractionStatus,
};

/// Fields supplied by the upload flow when a document row is created
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: String,
    pub storage_path: String,
    pub file_type: String,
    pub owner_id: String,
}

/// SQLite-backed document metadata store
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open database {:?}", path.as_ref()))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                storage_path TEXT NOT NULL,
                file_type TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                extraction_status TEXT NOT NULL DEFAULT 'pending',
                extracted_text TEXT,
                has_text INTEGER NOT NULL DEFAULT 0,
                text_length INTEGER NOT NULL DEFAULT 0,
                page_count INTEGER,
                processing_error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            );

            CREATE TABLE IF NOT EXISTS audit_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                action TEXT NOT NULL,
                details TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_logs_document ON audit_logs(document_id);
            ",
        )
        .context("Failed to initialise schema")?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    /// Create a pending document row.
    pub fn insert_document(&self, doc: &NewDocument) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (id, storage_path, file_type, owner_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![doc.id, doc.storage_path, doc.file_type, doc.owner_id, now],
        )
        .with_context(|| format!("Failed to insert document {}", doc.id))?;
        Ok(())
    }

    /// Hide a document from the pipeline without removing its row.
    pub fn soft_delete(&self, id: &str) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE documents SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            params![id, now],
        )?;
        Ok(changed > 0)
    }

    /// Audit entries for a document, oldest first.
    pub fn audit_log(&self, document_id: &str) -> Result<Vec<AuditEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT document_id, user_id, action, details FROM audit_logs
             WHERE document_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![document_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (document_id, user_id, action, details) = row?;
            let action = AuditAction::from_db_str(&action)
                .ok_or_else(|| anyhow!("Unknown audit action '{}'", action))?;
            entries.push(AuditEntry {
                document_id,
                user_id,
                action,
                details: serde_json::from_str(&details)?,
            });
        }
        Ok(entries)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<(DocumentRecord, String)> {
    let status: String = row.get(4)?;
    let text_length: i64 = row.get(7)?;
    let page_count: Option<i64> = row.get(8)?;
    Ok((
        DocumentRecord {
            id: row.get(0)?,
            storage_path: row.get(1)?,
            file_type: row.get(2)?,
            owner_id: row.get(3)?,
            extraction_status: ExtractionStatus::Pending,
            extracted_text: row.get(5)?,
            has_text: row.get(6)?,
            text_length: text_length.max(0) as usize,
            page_count: page_count.map(|n| n.max(0) as usize),
            processing_error: row.get(9)?,
        },
        status,
    ))
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT id, storage_path, file_type, owner_id, extraction_status, extracted_text,
                        has_text, text_length, page_count, processing_error
                 FROM documents WHERE id = ?1 AND deleted_at IS NULL",
                params![id],
                row_to_record,
            )
            .optional()
            .with_context(|| format!("Failed to load document {}", id))?;

        let Some((mut record, status)) = found else {
            return Ok(None);
        };
        record.extraction_status = ExtractionStatus::from_db_str(&status)
            .ok_or_else(|| anyhow!("Document {} has unknown status '{}'", id, status))?;
        Ok(Some(record))
    }

    async fn claim_processing(&self, id: &str, expected: ExtractionStatus) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE documents
             SET extraction_status = 'processing', processing_error = NULL, updated_at = ?3
             WHERE id = ?1 AND extraction_status = ?2 AND deleted_at IS NULL",
            params![id, expected.as_str(), now],
        )?;
        Ok(changed == 1)
    }

    async fn mark_completed(&self, id: &str, extraction: &CompletedExtraction) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "UPDATE documents
             SET extraction_status = 'completed', extracted_text = ?2, has_text = ?3,
                 text_length = ?4, page_count = ?5, processing_error = NULL, updated_at = ?6
             WHERE id = ?1",
            params![
                id,
                extraction.text,
                extraction.has_text,
                extraction.text_length as i64,
                extraction.page_count as i64,
                now
            ],
        )
        .with_context(|| format!("Failed to store extraction for {}", id))?;
        Ok(())
    }

    async fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "UPDATE documents
             SET extraction_status = 'failed', processing_error = ?2, updated_at = ?3
             WHERE id = ?1",
            params![id, error, now],
        )
        .with_context(|| format!("Failed to mark {} as failed", id))?;
        Ok(())
    }

    async fn insert_audit_log(&self, entry: &AuditEntry) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO audit_logs (document_id, user_id, action, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.document_id,
                entry.user_id,
                entry.action.as_str(),
                entry.details.to_string(),
                now
            ],
        )?;
        Ok(())
    }
}

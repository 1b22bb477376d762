use std::sync::Arc;

use serde_json::json;
use tracing::Instrument;

use crate::config::Settings;
use crate::error::IngestError;
use crate::extract::{Dispatcher, ExtractionMethod, ExtractionResult};
use crate::storage::{
    AuditAction, AuditEntry, CompletedExtraction, DocumentRecord, DocumentStore, ExtractionStatus,
    ObjectStore,
};
use crate::text::truncate;

use super::types::{ExtractionSummary, ProcessOutcome};

/// `has_text` is set when the stored text is longer than this
pub const HAS_TEXT_MIN_CHARS: usize = 50;

/// Runs extraction for one document at a time against injected stores.
#[derive(Clone)]
pub struct Ingestor {
    documents: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    dispatcher: Arc<Dispatcher>,
    settings: Arc<Settings>,
}

impl Ingestor {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        settings: Settings,
    ) -> anyhow::Result<Self> {
        let dispatcher = Dispatcher::new(&settings)?;
        Ok(Self::with_dispatcher(documents, objects, settings, dispatcher))
    }

    pub fn with_dispatcher(
        documents: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        settings: Settings,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            documents,
            objects,
            dispatcher: Arc::new(dispatcher),
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Process one document end to end.
    pub async fn process(&self, document_id: &str) -> Result<ProcessOutcome, IngestError> {
        let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();
        let span = tracing::info_span!("ingest", request_id = %request_id, doc_id = %document_id);
        self.run(document_id).instrument(span).await
    }

    async fn run(&self, document_id: &str) -> Result<ProcessOutcome, IngestError> {
        if document_id.trim().is_empty() {
            return Err(IngestError::InvalidRequest("documentId is required".to_string()));
        }

        let doc = self
            .documents
            .get_document(document_id)
            .await?
            .ok_or_else(|| IngestError::NotFound(document_id.to_string()))?;

        match doc.extraction_status {
            ExtractionStatus::Completed => {
                tracing::info!("Document already processed");
                return Ok(ProcessOutcome::AlreadyProcessed);
            }
            ExtractionStatus::Processing => {
                tracing::info!("Document is being processed elsewhere");
                return Ok(ProcessOutcome::AlreadyProcessing);
            }
            // Failed rows are retried
            ExtractionStatus::Pending | ExtractionStatus::Failed => {}
        }

        if !self
            .documents
            .claim_processing(&doc.id, doc.extraction_status)
            .await?
        {
            tracing::info!("Lost processing claim to a concurrent run");
            return Ok(ProcessOutcome::AlreadyProcessing);
        }

        self.audit(
            &doc,
            AuditAction::Started,
            json!({ "file_type": doc.file_type, "storage_path": doc.storage_path }),
        )
        .await;

        let bytes = match self.objects.download(&doc.storage_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let message = format!("Failed to download file: {:#}", e);
                self.fail(&doc, "download", &message).await;
                return Err(IngestError::Download(format!("{:#}", e)));
            }
        };

        tracing::info!(size = bytes.len(), "File downloaded");
        self.audit(
            &doc,
            AuditAction::FileDownloaded,
            json!({ "file_size": bytes.len() }),
        )
        .await;

        if bytes.len() < self.settings.empty_file_threshold {
            tracing::info!(size = bytes.len(), "File too small, storing empty-file sentinel");
            let result = ExtractionResult::empty_file();
            let stored = CompletedExtraction {
                text: result.text,
                has_text: false,
                text_length: 0,
                page_count: result.page_count,
            };
            return self
                .complete(&doc, stored, result.method, result.is_scanned, false)
                .await;
        }

        let result = match self.dispatch(&doc, bytes).await {
            Ok(result) => result,
            Err(message) => {
                self.fail(&doc, "extraction", &message).await;
                return Err(IngestError::Extraction(message));
            }
        };

        let (text, truncated) = truncate(result.text, self.settings.max_text_chars);
        if truncated {
            tracing::warn!(max_chars = self.settings.max_text_chars, "Extracted text truncated");
        }
        let text_length = text.chars().count();
        let stored = CompletedExtraction {
            text,
            has_text: text_length > HAS_TEXT_MIN_CHARS,
            text_length,
            page_count: result.page_count.max(1),
        };

        self.complete(&doc, stored, result.method, result.is_scanned, truncated)
            .await
    }

    /// Run the dispatcher on the blocking pool. A panic inside an extractor
    /// comes back as an error message.
    async fn dispatch(&self, doc: &DocumentRecord, bytes: Vec<u8>) -> Result<ExtractionResult, String> {
        let dispatcher = self.dispatcher.clone();
        let file_type = doc.file_type.clone();
        let path = doc.storage_path.clone();

        tokio::task::spawn_blocking(move || dispatcher.extract(&bytes, &file_type, &path))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    let payload = e.into_panic();
                    payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "Extractor panicked".to_string())
                } else {
                    e.to_string()
                }
            })
    }

    async fn complete(
        &self,
        doc: &DocumentRecord,
        stored: CompletedExtraction,
        method: ExtractionMethod,
        is_scanned: bool,
        truncated: bool,
    ) -> Result<ProcessOutcome, IngestError> {
        if let Err(e) = self.documents.mark_completed(&doc.id, &stored).await {
            self.fail(doc, "store", &format!("{:#}", e)).await;
            return Err(IngestError::Store(e));
        }

        let summary = ExtractionSummary {
            text_length: stored.text_length,
            page_count: stored.page_count,
            method,
            is_scanned,
            truncated,
        };

        tracing::info!(
            text_length = summary.text_length,
            page_count = summary.page_count,
            method = %summary.method,
            is_scanned = summary.is_scanned,
            "Extraction completed"
        );
        self.audit(
            doc,
            AuditAction::Completed,
            json!({
                "text_length": summary.text_length,
                "page_count": summary.page_count,
                "method": summary.method,
                "is_scanned": summary.is_scanned,
                "truncated": summary.truncated,
            }),
        )
        .await;

        Ok(ProcessOutcome::Completed(summary))
    }

    /// Persist `failed` with a readable error. Failures to persist are logged.
    async fn fail(&self, doc: &DocumentRecord, stage: &str, message: &str) {
        tracing::error!(stage, error = %message, "Processing failed");
        if let Err(e) = self.documents.mark_failed(&doc.id, message).await {
            tracing::error!(error = %e, "Failed to persist failed status");
        }
        self.audit(
            doc,
            AuditAction::Failed,
            json!({ "stage": stage, "error": message }),
        )
        .await;
    }

    async fn audit(&self, doc: &DocumentRecord, action: AuditAction, details: serde_json::Value) {
        let entry = AuditEntry {
            document_id: doc.id.clone(),
            user_id: doc.owner_id.clone(),
            action,
            details,
        };
        if let Err(e) = self.documents.insert_audit_log(&entry).await {
            tracing::warn!(action = action.as_str(), error = %e, "Failed to write audit log");
        }
    }
}

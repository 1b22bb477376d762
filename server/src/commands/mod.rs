//! HTTP handlers for the extraction trigger.

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use docsift_core::{AppState, ExtractionMethod, ProcessOutcome};

use crate::error::{ApiError, ApiResult};

/// Trigger payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub document_id: String,
}

/// Success body for `POST /process-document`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ExtractionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_scanned: Option<bool>,
}

impl From<ProcessOutcome> for ProcessResponse {
    fn from(outcome: ProcessOutcome) -> Self {
        let message = outcome.message().map(str::to_string);
        match outcome {
            ProcessOutcome::Completed(summary) => Self {
                success: true,
                message,
                text_length: Some(summary.text_length),
                page_count: Some(summary.page_count),
                method: Some(summary.method),
                is_scanned: Some(summary.is_scanned),
            },
            ProcessOutcome::AlreadyProcessed | ProcessOutcome::AlreadyProcessing => Self {
                success: true,
                message,
                text_length: None,
                page_count: None,
                method: None,
                is_scanned: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// Run extraction for the document named in the body.
///
/// The body is parsed by hand so malformed JSON maps to a 400 with the
/// standard error shape.
pub async fn process_document_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ProcessResponse>> {
    let request: ProcessRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(e.to_string()))?;

    if request.document_id.trim().is_empty() {
        return Err(ApiError::bad_request("documentId is required"));
    }

    tracing::info!(doc_id = %request.document_id, "Processing request received");
    let outcome = state.ingestor.process(&request.document_id).await?;
    Ok(Json(outcome.into()))
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Build the HTTP router. CORS is permissive; preflight requests get an
/// empty 200.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(process_document_handler))
        .route("/process-document", post(process_document_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests;

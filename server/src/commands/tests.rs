use super::*;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use docsift_core::storage::{NewDocument, SqliteDocumentStore};
use docsift_core::Config;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Create a test AppState with temporary directories
fn create_test_state(temp_dir: &std::path::Path) -> AppState {
    let config = Config::with_data_dir(temp_dir.to_path_buf(), "127.0.0.1:0".to_string());
    config.ensure_dirs().unwrap();
    AppState::new(config).unwrap()
}

/// Write an object and a pending document row pointing at it
fn add_document(state: &AppState, id: &str, file_type: &str, name: &str, bytes: &[u8]) {
    let path = format!("user-1/{}", name);
    let full = state.config.objects_dir.join(&path);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(&full, bytes).unwrap();

    let db = SqliteDocumentStore::open(&state.config.database_file).unwrap();
    db.insert_document(&NewDocument {
        id: id.to_string(),
        storage_path: path,
        file_type: file_type.to_string(),
        owner_id: "user-1".to_string(),
    })
    .unwrap();
}

async fn call(state: &AppState, body: &str) -> (StatusCode, serde_json::Value) {
    let response = process_document_handler(State(state.clone()), Bytes::from(body.to_string()))
        .await
        .into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ============================================================================
// Process Document Tests
// ============================================================================

#[tokio::test]
async fn test_process_pdf_document() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = create_test_state(temp_dir.path());
    let pdf = b"%PDF-1.4\n1 0 obj\n<< /Type /Page >>\nendobj\n2 0 obj\n<< /Length 44 >>\nstream\nBT /F1 24 Tf 72 712 Td (Hello World) Tj ET\nendstream\nendobj\n%%EOF\n";
    add_document(&state, "doc-1", "pdf", "hello.pdf", pdf);

    let (status, body) = call(&state, r#"{"documentId":"doc-1"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["method"], "text");
    assert_eq!(body["pageCount"], 1);
    assert_eq!(body["isScanned"], false);
    assert!(body["textLength"].as_u64().unwrap() > 0);
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn test_process_twice_is_idempotent() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = create_test_state(temp_dir.path());
    add_document(&state, "doc-1", "txt", "a.txt", &[b'z'; 50]);

    let (status, first) = call(&state, r#"{"documentId":"doc-1"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["textLength"], 0);

    let (status, second) = call(&state, r#"{"documentId":"doc-1"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        second,
        serde_json::json!({ "success": true, "message": "Already processed" })
    );
}

#[tokio::test]
async fn test_unknown_document_is_404() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = create_test_state(temp_dir.path());

    let (status, body) = call(&state, r#"{"documentId":"missing"}"#).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Document not found");
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = create_test_state(temp_dir.path());

    for body in ["not json", "{}", r#"{"documentId": 7}"#, r#"{"documentId": ""}"#] {
        let (status, json) = call(&state, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(json["error"], "Invalid request");
        assert!(json["details"].is_string());
    }
}

#[tokio::test]
async fn test_download_failure_is_500() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = create_test_state(temp_dir.path());
    let db = SqliteDocumentStore::open(&state.config.database_file).unwrap();
    db.insert_document(&NewDocument {
        id: "doc-1".into(),
        storage_path: "user-1/gone.pdf".into(),
        file_type: "pdf".into(),
        owner_id: "user-1".into(),
    })
    .unwrap();

    let (status, body) = call(&state, r#"{"documentId":"doc-1"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to download file");
    assert!(body["details"].as_str().unwrap().contains("gone.pdf"));
}

#[tokio::test]
async fn test_health() {
    let Json(health) = health_handler().await;
    assert_eq!(health.status, "healthy");
    assert!(!health.timestamp.is_empty());
}

// ============================================================================
// Router Tests
// ============================================================================

/// Send a raw HTTP/1.1 request to the router and return the full response text
async fn raw_request(state: AppState, request: &str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response.to_ascii_lowercase()
}

#[tokio::test]
async fn test_cors_preflight() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = create_test_state(temp_dir.path());

    let response = raw_request(
        state,
        "OPTIONS /process-document HTTP/1.1\r\nHost: localhost\r\nOrigin: http://app.example\r\nAccess-Control-Request-Method: POST\r\nAccess-Control-Request-Headers: content-type\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("http/1.1 200"), "got: {}", response);
    assert!(response.contains("access-control-allow-origin: *"));
}

#[tokio::test]
async fn test_root_route_accepts_trigger() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = create_test_state(temp_dir.path());
    add_document(&state, "doc-1", "txt", "a.txt", &[b'z'; 10]);

    let body = r#"{"documentId":"doc-1"}"#;
    let response = raw_request(
        state,
        &format!(
            "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ),
    )
    .await;

    assert!(response.starts_with("http/1.1 200"), "got: {}", response);
    assert!(response.contains("\"success\":true"));
}

use super::*;

use std::{sync::Mutex as StdMutex, time::Duration};

use axum::{
    extract::{Multipart, Path},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::Sentiment;
use tokio::net::TcpListener;

use crate::selection::FileCandidate;

async fn spawn_server(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn api_for(base_url: String) -> HttpAnalyzerApi {
    HttpAnalyzerApi::new(&ClientSettings {
        api_base_url: base_url,
        ..ClientSettings::default()
    })
    .expect("client")
}

fn pdf(size: usize) -> SelectedFile {
    SelectedFile::try_from(FileCandidate::new("report.pdf", vec![7u8; size])).expect("valid pdf")
}

async fn handle_upload(mut multipart: Multipart) -> Json<Value> {
    let mut seen = (String::new(), String::new(), 0usize);
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let size = field.bytes().await.map(|b| b.len()).unwrap_or_default();
        seen = (filename, content_type, size);
    }
    let (filename, content_type, size) = seen;
    Json(json!({
        "status": "success",
        "filename": filename,
        "original_text": "preview",
        "full_text": format!("{content_type} {size}"),
        "summary": "Ringkasan",
        "keywords": ["anggaran"],
        "entities": null,
        "sentiment": "Neutral",
        "enriched_info": null,
        "file_type": "pdf"
    }))
}

async fn handle_save(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "document": {
            "id": 5,
            "filename": body["filename"],
            "original_text": "",
            "sentiment": body["sentiment"],
            "created_at": "2024-05-01T08:30:00.123456"
        }
    }))
}

async fn handle_regenerate(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "summary": format!("{}|{}", body["filename"].as_str().unwrap_or_default(), body["doc_id"]),
        "sentiment": "Negative"
    }))
}

async fn handle_list() -> Json<Value> {
    Json(json!({
        "documents": [
            { "id": 1, "filename": "a.pdf", "file_type": "pdf", "created_at": "2024-01-02T03:04:05" },
            { "id": 2, "filename": "b.docx", "summary": null, "keywords": null }
        ]
    }))
}

async fn handle_get(Path(id): Path<i64>) -> (StatusCode, String) {
    match id {
        1 => (
            StatusCode::OK,
            json!({ "id": 1, "filename": "a.pdf", "full_text": "isi" }).to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        ),
    }
}

async fn handle_delete(Path(id): Path<i64>) -> Result<Json<Value>, (StatusCode, Json<ErrorBody>)> {
    match id {
        1 => Ok(Json(json!({ "status": "success" }))),
        _ => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new("Document not found")),
        )),
    }
}

async fn handle_extract(Json(body): Json<Value>) -> Json<Value> {
    let text = body["text"].as_str().unwrap_or_default();
    Json(json!({
        "status": "success",
        "nota_dinas": {
            "nomor": "ND-1/2024",
            "hal": text,
            "kepada": ["Kepala Bagian Umum"],
            "tembusan": null
        }
    }))
}

async fn handle_reply() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "LLM quota exceeded" })),
    )
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "healthy", "database": "connected" }))
}

fn backend() -> Router {
    Router::new()
        .route("/api/upload", post(handle_upload))
        .route("/api/save", post(handle_save))
        .route("/api/regenerate", post(handle_regenerate))
        .route("/api/documents", get(handle_list))
        .route("/api/documents/:id", get(handle_get).delete(handle_delete))
        .route("/api/extract-nota-dinas", post(handle_extract))
        .route("/api/generate-balasan", post(handle_reply))
        .route("/api/health", get(handle_health))
}

#[tokio::test]
async fn upload_streams_multipart_file_and_reports_progress() {
    let api = api_for(spawn_server(backend()).await);
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let progress: ProgressFn = {
        let seen = Arc::clone(&seen);
        Arc::new(move |percent| seen.lock().unwrap().push(percent))
    };

    let result = api
        .upload(&pdf(200_000), Some(progress))
        .await
        .expect("upload");

    assert_eq!(result.filename, "report.pdf");
    assert_eq!(result.full_text, "application/pdf 200000");
    assert_eq!(result.sentiment, Some(Sentiment::Neutral));
    assert!(result.entities.is_empty());
    assert!(result.enriched_info.is_empty());
    assert_eq!(result.doc_id, None);

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn save_returns_the_stored_record() {
    let api = api_for(spawn_server(backend()).await);
    let request = SaveDocumentRequest::from(&AnalysisResult {
        filename: "report.pdf".into(),
        ..AnalysisResult::default()
    });

    let record = api.save(&request).await.expect("save");

    assert_eq!(record.id, DocumentId(5));
    assert_eq!(record.filename, "report.pdf");
    assert_eq!(record.sentiment, None);
    assert_eq!(
        record.created_at.map(|ts| ts.to_rfc3339()),
        Some("2024-05-01T08:30:00.123456+00:00".to_string())
    );
}

#[tokio::test]
async fn regenerate_sends_null_doc_id_and_returns_partial_result() {
    let api = api_for(spawn_server(backend()).await);

    let patch = api
        .regenerate(&RegenerateRequest {
            full_text: "teks".into(),
            filename: "report.pdf".into(),
            doc_id: None,
        })
        .await
        .expect("regenerate");

    assert_eq!(patch.summary.as_deref(), Some("report.pdf|null"));
    assert_eq!(patch.sentiment, Some(Sentiment::Negative));
    assert_eq!(patch.keywords, None);
    assert_eq!(patch.full_text, None);
}

#[tokio::test]
async fn listing_tolerates_missing_and_null_fields() {
    let api = api_for(spawn_server(backend()).await);

    let documents = api.list_documents().await.expect("list");

    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].file_type.as_deref(), Some("pdf"));
    assert!(documents[0].created_at.is_some());
    assert_eq!(documents[1].summary, None);
    assert!(documents[1].keywords.is_empty());
    assert!(documents[1].created_at.is_none());
}

#[tokio::test]
async fn get_document_maps_plain_text_errors_to_status_only() {
    let api = api_for(spawn_server(backend()).await);

    let doc = api.get_document(DocumentId(1)).await.expect("detail");
    assert_eq!(doc.full_text, "isi");

    let err = api.get_document(DocumentId(2)).await.expect_err("500");
    assert!(matches!(
        err,
        ClientError::Server {
            status: 500,
            message: None
        }
    ));
}

#[tokio::test]
async fn delete_reports_not_found_with_server_message() {
    let api = api_for(spawn_server(backend()).await);

    api.delete_document(DocumentId(1)).await.expect("delete");
    let err = api
        .delete_document(DocumentId(999))
        .await
        .expect_err("missing");

    match err {
        ClientError::Server { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message.as_deref(), Some("Document not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn extract_memo_unwraps_nota_dinas() {
    let api = api_for(spawn_server(backend()).await);

    let memo = api.extract_memo("Permintaan data").await.expect("memo");

    assert_eq!(memo.nomor.as_deref(), Some("ND-1/2024"));
    assert_eq!(memo.hal.as_deref(), Some("Permintaan data"));
    assert_eq!(memo.kepada, vec!["Kepala Bagian Umum"]);
    assert!(memo.tembusan.is_empty());
    assert_eq!(memo.sifat, None);
}

#[tokio::test]
async fn reply_error_body_is_extracted() {
    let api = api_for(spawn_server(backend()).await);
    let request = GenerateReplyRequest {
        nota_dinas_data: MemoDocument::default(),
        text: "teks".into(),
        unit_pembalas: String::new(),
        nama_ttd: String::new(),
        jabatan_ttd: String::new(),
    };

    let err = api.generate_reply(&request).await.expect_err("500");

    assert!(matches!(
        &err,
        ClientError::Server { status: 500, message: Some(m) } if m == "LLM quota exceeded"
    ));
}

#[tokio::test]
async fn health_returns_raw_payload() {
    let api = api_for(spawn_server(backend()).await);

    let status = api.health().await.expect("health");

    assert_eq!(status["status"], "healthy");
}

#[tokio::test]
async fn slow_regenerate_times_out() {
    async fn slow() -> Json<Value> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Json(json!({}))
    }
    let base_url = spawn_server(Router::new().route("/api/regenerate", post(slow))).await;
    let api = HttpAnalyzerApi::new(&ClientSettings {
        api_base_url: base_url,
        regenerate_timeout: Duration::from_millis(100),
        ..ClientSettings::default()
    })
    .expect("client");

    let err = api
        .regenerate(&RegenerateRequest {
            full_text: "teks".into(),
            filename: "a.pdf".into(),
            doc_id: Some(DocumentId(1)),
        })
        .await
        .expect_err("timeout");

    assert!(matches!(err, ClientError::Timeout));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = api_for(format!("http://{addr}"))
        .health()
        .await
        .expect_err("closed port");

    assert!(matches!(err, ClientError::Transport(_)));
}

#[test]
fn upload_percent_is_bounded() {
    assert_eq!(upload_percent(0, 0), 100);
    assert_eq!(upload_percent(0, 200), 0);
    assert_eq!(upload_percent(50, 200), 25);
    assert_eq!(upload_percent(500, 200), 100);
}

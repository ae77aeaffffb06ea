use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Body, Client, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::DocumentId,
    error::ErrorBody,
    protocol::{
        AnalysisPatch, AnalysisResult, DocumentListResponse, DocumentRecord, ExtractMemoRequest,
        ExtractMemoResponse, GenerateReplyRequest, GenerateReplyResponse, MemoDocument,
        RegenerateRequest, ReplyDraft, SaveDocumentRequest, SaveDocumentResponse,
    },
};
use tracing::debug;

use crate::{
    config::ClientSettings,
    error::{ClientError, ClientResult},
    selection::SelectedFile,
};

const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Receives upload progress as a whole percentage.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// The backend's HTTP contract, one method per endpoint.
#[async_trait]
pub trait AnalyzerApi: Send + Sync {
    /// `POST /api/upload` (multipart field `file`).
    async fn upload(
        &self,
        file: &SelectedFile,
        progress: Option<ProgressFn>,
    ) -> ClientResult<AnalysisResult>;
    /// `POST /api/save`
    async fn save(&self, request: &SaveDocumentRequest) -> ClientResult<DocumentRecord>;
    /// `POST /api/regenerate`
    async fn regenerate(&self, request: &RegenerateRequest) -> ClientResult<AnalysisPatch>;
    /// `GET /api/documents`
    async fn list_documents(&self) -> ClientResult<Vec<DocumentRecord>>;
    /// `GET /api/documents/{id}`
    async fn get_document(&self, id: DocumentId) -> ClientResult<DocumentRecord>;
    /// `DELETE /api/documents/{id}`
    async fn delete_document(&self, id: DocumentId) -> ClientResult<()>;
    /// `POST /api/extract-nota-dinas`
    async fn extract_memo(&self, text: &str) -> ClientResult<MemoDocument>;
    /// `POST /api/generate-balasan`
    async fn generate_reply(&self, request: &GenerateReplyRequest) -> ClientResult<ReplyDraft>;
    /// `GET /api/health`
    async fn health(&self) -> ClientResult<serde_json::Value>;
}

pub struct HttpAnalyzerApi {
    http: Client,
    base_url: String,
    analyze_timeout: Duration,
    regenerate_timeout: Duration,
    request_timeout: Option<Duration>,
}

impl HttpAnalyzerApi {
    pub fn new(settings: &ClientSettings) -> ClientResult<Self> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            analyze_timeout: settings.analyze_timeout,
            regenerate_timeout: settings.regenerate_timeout,
            request_timeout: settings.request_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn with_default_timeout(&self, request: RequestBuilder) -> RequestBuilder {
        match self.request_timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }
}

#[async_trait]
impl AnalyzerApi for HttpAnalyzerApi {
    async fn upload(
        &self,
        file: &SelectedFile,
        progress: Option<ProgressFn>,
    ) -> ClientResult<AnalysisResult> {
        let mime = mime_guess::from_path(file.name()).first_or_octet_stream();
        let part = Part::stream_with_length(progress_body(file.bytes(), progress), file.size())
            .file_name(file.name().to_string())
            .mime_str(mime.essence_str())?;
        let form = Form::new().part("file", part);

        debug!(filename = file.name(), size = file.size(), "uploading document");
        let response = self
            .http
            .post(self.url("/api/upload"))
            .multipart(form)
            .timeout(self.analyze_timeout)
            .send()
            .await?;
        read_json(response).await
    }

    async fn save(&self, request: &SaveDocumentRequest) -> ClientResult<DocumentRecord> {
        let response = self
            .with_default_timeout(self.http.post(self.url("/api/save")).json(request))
            .send()
            .await?;
        let body: SaveDocumentResponse = read_json(response).await?;
        Ok(body.document)
    }

    async fn regenerate(&self, request: &RegenerateRequest) -> ClientResult<AnalysisPatch> {
        let response = self
            .http
            .post(self.url("/api/regenerate"))
            .json(request)
            .timeout(self.regenerate_timeout)
            .send()
            .await?;
        read_json(response).await
    }

    async fn list_documents(&self) -> ClientResult<Vec<DocumentRecord>> {
        let response = self
            .with_default_timeout(self.http.get(self.url("/api/documents")))
            .send()
            .await?;
        let body: DocumentListResponse = read_json(response).await?;
        Ok(body.documents)
    }

    async fn get_document(&self, id: DocumentId) -> ClientResult<DocumentRecord> {
        let response = self
            .with_default_timeout(self.http.get(self.url(&format!("/api/documents/{}", id.0))))
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete_document(&self, id: DocumentId) -> ClientResult<()> {
        let response = self
            .with_default_timeout(
                self.http
                    .delete(self.url(&format!("/api/documents/{}", id.0))),
            )
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn extract_memo(&self, text: &str) -> ClientResult<MemoDocument> {
        let response = self
            .with_default_timeout(
                self.http
                    .post(self.url("/api/extract-nota-dinas"))
                    .json(&ExtractMemoRequest {
                        text: text.to_string(),
                    }),
            )
            .send()
            .await?;
        let body: ExtractMemoResponse = read_json(response).await?;
        Ok(body.nota_dinas)
    }

    async fn generate_reply(&self, request: &GenerateReplyRequest) -> ClientResult<ReplyDraft> {
        let response = self
            .with_default_timeout(
                self.http
                    .post(self.url("/api/generate-balasan"))
                    .json(request),
            )
            .send()
            .await?;
        let body: GenerateReplyResponse = read_json(response).await?;
        Ok(body.balasan)
    }

    async fn health(&self) -> ClientResult<serde_json::Value> {
        let response = self
            .with_default_timeout(self.http.get(self.url("/api/health")))
            .send()
            .await?;
        read_json(response).await
    }
}

/// Maps non-2xx responses to `ClientError::Server`, pulling the `error`
/// string out of the body when there is one.
async fn ensure_success(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.ok();
    let message = body
        .as_deref()
        .and_then(ErrorBody::message_from_bytes);
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let response = ensure_success(response).await?;
    Ok(response.json::<T>().await?)
}

/// Streams the file in fixed chunks, reporting the share handed to the
/// connection so far.
fn progress_body(bytes: Arc<Vec<u8>>, progress: Option<ProgressFn>) -> Body {
    let total = bytes.len();
    let mut last_reported: Option<u8> = None;
    let chunks = (0..total).step_by(UPLOAD_CHUNK_BYTES).map(move |start| {
        let end = usize::min(start + UPLOAD_CHUNK_BYTES, total);
        if let Some(report) = &progress {
            let percent = upload_percent(end, total);
            if last_reported != Some(percent) {
                last_reported = Some(percent);
                report(percent);
            }
        }
        Ok::<_, std::io::Error>(bytes[start..end].to_vec())
    });
    Body::wrap_stream(futures::stream::iter(chunks))
}

fn upload_percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent.min(total) as u128 * 100) / total as u128) as u8
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;

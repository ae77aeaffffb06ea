use std::{
    collections::VecDeque,
    sync::{Arc, Mutex as StdMutex},
};

use async_trait::async_trait;
use shared::{
    domain::{DocumentId, Sentiment},
    protocol::{
        AnalysisPatch, AnalysisResult, DocumentRecord, Entity, GenerateReplyRequest,
        MemoDocument, RegenerateRequest, ReplyDraft, SaveDocumentRequest,
    },
};
use tokio::sync::{broadcast, oneshot, Notify};

use crate::{
    error::{ClientError, ClientResult},
    selection::{FileCandidate, SelectedFile},
    transport::{AnalyzerApi, ProgressFn},
    ClientEvent, Notice,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ApiCall {
    Upload(String),
    Save(SaveDocumentRequest),
    Regenerate(RegenerateRequest),
    ListDocuments,
    GetDocument(DocumentId),
    DeleteDocument(DocumentId),
    ExtractMemo(String),
    GenerateReply(GenerateReplyRequest),
    Health,
}

/// In-memory backend. Queued responses are served first; otherwise it
/// behaves like a small document store.
#[derive(Default)]
pub(crate) struct FakeApi {
    calls: StdMutex<Vec<ApiCall>>,
    uploads: StdMutex<VecDeque<ClientResult<AnalysisResult>>>,
    upload_gates: StdMutex<VecDeque<oneshot::Receiver<()>>>,
    pub(crate) upload_started: Notify,
    saves: StdMutex<VecDeque<ClientError>>,
    save_gates: StdMutex<VecDeque<oneshot::Receiver<()>>>,
    pub(crate) save_started: Notify,
    regenerations: StdMutex<VecDeque<ClientResult<AnalysisPatch>>>,
    listing_failures: StdMutex<VecDeque<ClientError>>,
    memos: StdMutex<VecDeque<ClientResult<MemoDocument>>>,
    replies: StdMutex<VecDeque<ClientResult<ReplyDraft>>>,
    health_failure: StdMutex<Option<ClientError>>,
    store: StdMutex<Vec<DocumentRecord>>,
    next_id: StdMutex<i64>,
}

impl FakeApi {
    pub(crate) fn new() -> Arc<Self> {
        let api = Self::default();
        *api.next_id.lock().unwrap() = 1;
        Arc::new(api)
    }

    pub(crate) fn with_documents(documents: Vec<DocumentRecord>) -> Arc<Self> {
        let api = Self::new();
        let next = documents.iter().map(|d| d.id.0).max().unwrap_or(0) + 1;
        *api.store.lock().unwrap() = documents;
        *api.next_id.lock().unwrap() = next;
        api
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn count(&self, pred: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn push_upload(&self, result: ClientResult<AnalysisResult>) {
        self.uploads.lock().unwrap().push_back(result);
    }

    /// The next upload waits until the returned sender fires (or drops).
    pub(crate) fn hold_next_upload(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.upload_gates.lock().unwrap().push_back(rx);
        tx
    }

    pub(crate) fn fail_next_save(&self, err: ClientError) {
        self.saves.lock().unwrap().push_back(err);
    }

    pub(crate) fn hold_next_save(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.save_gates.lock().unwrap().push_back(rx);
        tx
    }

    pub(crate) fn push_regenerate(&self, result: ClientResult<AnalysisPatch>) {
        self.regenerations.lock().unwrap().push_back(result);
    }

    pub(crate) fn fail_next_listing(&self, err: ClientError) {
        self.listing_failures.lock().unwrap().push_back(err);
    }

    pub(crate) fn push_memo(&self, result: ClientResult<MemoDocument>) {
        self.memos.lock().unwrap().push_back(result);
    }

    pub(crate) fn push_reply(&self, result: ClientResult<ReplyDraft>) {
        self.replies.lock().unwrap().push_back(result);
    }

    pub(crate) fn fail_health(&self, err: ClientError) {
        *self.health_failure.lock().unwrap() = Some(err);
    }

    pub(crate) fn stored_ids(&self) -> Vec<DocumentId> {
        self.store.lock().unwrap().iter().map(|d| d.id).collect()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AnalyzerApi for FakeApi {
    async fn upload(
        &self,
        file: &SelectedFile,
        progress: Option<ProgressFn>,
    ) -> ClientResult<AnalysisResult> {
        self.record(ApiCall::Upload(file.name().to_string()));
        self.upload_started.notify_one();
        let gate = self.upload_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(report) = progress {
            report(100);
        }
        let queued = self.uploads.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(analysis_for(file.name())))
    }

    async fn save(&self, request: &SaveDocumentRequest) -> ClientResult<DocumentRecord> {
        self.record(ApiCall::Save(request.clone()));
        self.save_started.notify_one();
        let gate = self.save_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(err) = self.saves.lock().unwrap().pop_front() {
            return Err(err);
        }
        let id = {
            let mut next = self.next_id.lock().unwrap();
            let id = DocumentId(*next);
            *next += 1;
            id
        };
        let mut doc = record(id.0, &request.filename);
        doc.full_text = request.full_text.clone();
        doc.summary = Some(request.summary.clone());
        doc.keywords = request.keywords.clone();
        doc.sentiment = request.sentiment;
        self.store.lock().unwrap().push(doc.clone());
        Ok(doc)
    }

    async fn regenerate(&self, request: &RegenerateRequest) -> ClientResult<AnalysisPatch> {
        self.record(ApiCall::Regenerate(request.clone()));
        let queued = self.regenerations.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(AnalysisPatch::default()))
    }

    async fn list_documents(&self) -> ClientResult<Vec<DocumentRecord>> {
        self.record(ApiCall::ListDocuments);
        if let Some(err) = self.listing_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.store.lock().unwrap().clone())
    }

    async fn get_document(&self, id: DocumentId) -> ClientResult<DocumentRecord> {
        self.record(ApiCall::GetDocument(id));
        self.store
            .lock()
            .unwrap()
            .iter()
            .find(|doc| doc.id == id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn delete_document(&self, id: DocumentId) -> ClientResult<()> {
        self.record(ApiCall::DeleteDocument(id));
        let mut store = self.store.lock().unwrap();
        let before = store.len();
        store.retain(|doc| doc.id != id);
        if store.len() == before {
            return Err(not_found());
        }
        Ok(())
    }

    async fn extract_memo(&self, text: &str) -> ClientResult<MemoDocument> {
        self.record(ApiCall::ExtractMemo(text.to_string()));
        let queued = self.memos.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(MemoDocument::default()))
    }

    async fn generate_reply(&self, request: &GenerateReplyRequest) -> ClientResult<ReplyDraft> {
        self.record(ApiCall::GenerateReply(request.clone()));
        let queued = self.replies.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(ReplyDraft::default()))
    }

    async fn health(&self) -> ClientResult<serde_json::Value> {
        self.record(ApiCall::Health);
        match self.health_failure.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(serde_json::json!({ "status": "healthy" })),
        }
    }
}

fn not_found() -> ClientError {
    ClientError::Server {
        status: 404,
        message: Some("Document not found".into()),
    }
}

pub(crate) fn analysis_for(filename: &str) -> AnalysisResult {
    AnalysisResult {
        filename: filename.to_string(),
        full_text: format!("Isi dokumen {filename}"),
        summary: "Ringkasan awal".into(),
        keywords: vec!["anggaran".into(), "rapat".into()],
        entities: vec![Entity {
            text: "Jakarta".into(),
            label: "LOC".into(),
            description: "Lokasi".into(),
        }],
        sentiment: Some(Sentiment::Positive),
        enriched_info: String::new(),
        file_type: "pdf".into(),
        doc_id: None,
    }
}

pub(crate) fn record(id: i64, filename: &str) -> DocumentRecord {
    DocumentRecord {
        id: DocumentId(id),
        filename: filename.to_string(),
        original_text: String::new(),
        full_text: String::new(),
        summary: None,
        keywords: Vec::new(),
        entities: Vec::new(),
        sentiment: None,
        enriched_info: None,
        file_type: filename.rsplit('.').next().map(str::to_string),
        created_at: None,
        updated_at: None,
    }
}

pub(crate) fn candidate(name: &str, size: usize) -> FileCandidate {
    FileCandidate::new(name, vec![b'x'; size])
}

pub(crate) fn event_channel() -> (broadcast::Sender<ClientEvent>, broadcast::Receiver<ClientEvent>) {
    broadcast::channel(256)
}

pub(crate) fn drain_events(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub(crate) fn drain_notices(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<Notice> {
    drain_events(rx)
        .into_iter()
        .filter_map(|event| match event {
            ClientEvent::Notice(notice) => Some(notice),
            _ => None,
        })
        .collect()
}

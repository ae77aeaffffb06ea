use std::sync::Arc;

use shared::{domain::DocumentId, protocol::DocumentRecord};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::{
    emit_notice,
    error::{ClientError, ClientResult, Operation},
    report_failure,
    transport::AnalyzerApi,
    ClientEvent, Notice,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum HistoryState {
    #[default]
    Idle,
    Loading,
    Empty,
    Listed(Vec<DocumentRecord>),
    Failed,
}

/// Interactive yes/no confirmation, asked before destructive actions.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

#[derive(Default)]
struct HistoryInner {
    state: HistoryState,
    query: String,
    generation: u64,
}

pub struct HistoryBrowser {
    api: Arc<dyn AnalyzerApi>,
    events: broadcast::Sender<ClientEvent>,
    inner: Mutex<HistoryInner>,
}

impl HistoryBrowser {
    pub fn new(api: Arc<dyn AnalyzerApi>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            api,
            events,
            inner: Mutex::new(HistoryInner::default()),
        }
    }

    pub async fn state(&self) -> HistoryState {
        self.inner.lock().await.state.clone()
    }

    /// Fetches the full listing. Only the newest refresh updates the state.
    pub async fn refresh(&self) -> ClientResult<Vec<DocumentRecord>> {
        let generation = {
            let mut guard = self.inner.lock().await;
            guard.generation += 1;
            guard.state = HistoryState::Loading;
            guard.generation
        };
        let _ = self
            .events
            .send(ClientEvent::HistoryUpdated(HistoryState::Loading));

        let outcome = self.api.list_documents().await;

        let (state, result) = {
            let mut guard = self.inner.lock().await;
            if guard.generation != generation {
                (None, Err(ClientError::Superseded))
            } else {
                let (state, result) = match outcome {
                    Ok(documents) if documents.is_empty() => (HistoryState::Empty, Ok(documents)),
                    Ok(documents) => (HistoryState::Listed(documents.clone()), Ok(documents)),
                    Err(err) => (HistoryState::Failed, Err(err)),
                };
                guard.state = state.clone();
                (Some(state), result)
            }
        };

        if let Some(state) = state {
            let _ = self.events.send(ClientEvent::HistoryUpdated(state));
        }
        match result {
            Ok(documents) => {
                debug!(count = documents.len(), "history: listing loaded");
                Ok(documents)
            }
            Err(err) => {
                report_failure(&self.events, Operation::History, &err);
                Err(err)
            }
        }
    }

    /// Filters the last listing without touching the network. Matches a
    /// case-insensitive substring of id, filename, file type or sentiment;
    /// a blank query matches everything.
    pub async fn search(&self, query: &str) -> Vec<DocumentRecord> {
        let mut guard = self.inner.lock().await;
        guard.query = query.trim().to_lowercase();
        filter_documents(&guard.state, &guard.query)
    }

    /// The current listing with the active search applied.
    pub async fn visible(&self) -> Vec<DocumentRecord> {
        let guard = self.inner.lock().await;
        filter_documents(&guard.state, &guard.query)
    }

    pub async fn view_detail(&self, id: DocumentId) -> ClientResult<DocumentRecord> {
        match self.api.get_document(id).await {
            Ok(record) => {
                let _ = self
                    .events
                    .send(ClientEvent::DocumentDetailLoaded(Box::new(record.clone())));
                Ok(record)
            }
            Err(err) => {
                report_failure(&self.events, Operation::Detail, &err);
                Err(err)
            }
        }
    }

    /// Deletes after confirmation, then reloads the listing. Returns `false`
    /// when the user declined.
    pub async fn delete(&self, id: DocumentId, prompt: &dyn ConfirmPrompt) -> ClientResult<bool> {
        if !prompt.confirm(&format!("Hapus dokumen ID {id}?")) {
            debug!(doc_id = id.0, "history: delete declined");
            return Ok(false);
        }

        if let Err(err) = self.api.delete_document(id).await {
            report_failure(&self.events, Operation::Delete, &err);
            return Err(err);
        }

        info!(doc_id = id.0, "history: document deleted");
        emit_notice(&self.events, Notice::info(format!("Dokumen ID {id} dihapus.")));
        // A failed reload is already reported by `refresh`.
        let _ = self.refresh().await;
        Ok(true)
    }
}

fn filter_documents(state: &HistoryState, query: &str) -> Vec<DocumentRecord> {
    let HistoryState::Listed(documents) = state else {
        return Vec::new();
    };
    documents
        .iter()
        .filter(|doc| query.is_empty() || matches_query(doc, query))
        .cloned()
        .collect()
}

fn matches_query(doc: &DocumentRecord, query: &str) -> bool {
    let id = doc.id.to_string();
    let sentiment = doc.sentiment.map(|s| s.as_str()).unwrap_or_default();
    [
        id.as_str(),
        doc.filename.as_str(),
        doc.file_type.as_deref().unwrap_or_default(),
        sentiment,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(query))
}

#[cfg(test)]
#[path = "tests/history_tests.rs"]
mod tests;

use std::sync::Arc;

use shared::{
    domain::DocumentId,
    protocol::{AnalysisResult, DocumentRecord, ReplyDraft},
};
use tokio::sync::broadcast;
use tracing::{info, warn};

pub mod config;
pub mod error;
pub mod history;
pub mod memo;
pub mod selection;
pub mod session;
pub mod transport;
pub mod view;

pub use config::{load_settings, ClientSettings};
pub use error::{ClientError, ClientResult, Operation, ValidationError};
pub use history::{ConfirmPrompt, HistoryBrowser, HistoryState};
pub use memo::{ClipboardSink, DraftTab, MemoContext, MemoWorkflow, ReplyWorkspace, SignerInfo};
pub use selection::{FileCandidate, FileSource, SelectedFile, MAX_UPLOAD_BYTES};
pub use session::{AnalysisSession, ResultTab, SessionSnapshot};
pub use transport::{AnalyzerApi, HttpAnalyzerApi, ProgressFn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A transient, user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    Notice(Notice),
    /// Label of the current selection, `None` after a clear.
    SelectionChanged(Option<String>),
    AnalyzeBusy(bool),
    UploadProgress {
        percent: u8,
    },
    AnalysisUpdated(Box<AnalysisResult>),
    AnalysisCleared,
    DocumentSaved(DocumentId),
    HistoryUpdated(HistoryState),
    DocumentDetailLoaded(Box<DocumentRecord>),
    MemoExtracted(Box<MemoContext>),
    MemoCleared,
    ReplyDraftReady(Box<ReplyDraft>),
}

pub(crate) fn emit_notice(events: &broadcast::Sender<ClientEvent>, notice: Notice) {
    let _ = events.send(ClientEvent::Notice(notice));
}

/// Logs a failed operation and turns it into the matching notification.
pub(crate) fn report_failure(
    events: &broadcast::Sender<ClientEvent>,
    operation: Operation,
    err: &ClientError,
) {
    match err.notice(operation) {
        Some(notice) => {
            warn!(operation = operation.name(), error = %err, "operation failed");
            emit_notice(events, notice);
        }
        None => info!(operation = operation.name(), "dropping superseded response"),
    }
}

/// Entry point: one backend, one event stream, any number of workflows.
pub struct DocumentAnalyzerClient {
    api: Arc<dyn AnalyzerApi>,
    events: broadcast::Sender<ClientEvent>,
}

impl DocumentAnalyzerClient {
    pub fn new(settings: &ClientSettings) -> ClientResult<Self> {
        Ok(Self::with_api(Arc::new(HttpAnalyzerApi::new(settings)?)))
    }

    pub fn with_api(api: Arc<dyn AnalyzerApi>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { api, events }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn analysis_session(&self) -> AnalysisSession {
        AnalysisSession::new(Arc::clone(&self.api), self.events.clone())
    }

    pub fn history(&self) -> HistoryBrowser {
        HistoryBrowser::new(Arc::clone(&self.api), self.events.clone())
    }

    pub fn memo_workflow(&self) -> MemoWorkflow {
        MemoWorkflow::new(Arc::clone(&self.api), self.events.clone())
    }

    /// Probes the backend. The payload is only logged.
    pub async fn health(&self) -> ClientResult<serde_json::Value> {
        match self.api.health().await {
            Ok(status) => {
                info!(%status, "api health ok");
                Ok(status)
            }
            Err(err) => {
                report_failure(&self.events, Operation::Health, &err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

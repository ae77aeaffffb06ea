//! Nota Dinas workflow: file -> raw text -> structured memo -> reply draft.

use std::sync::Arc;

use shared::protocol::{GenerateReplyRequest, MemoDocument, ReplyDraft};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::{
    emit_notice,
    error::{ClientError, ClientResult, Operation, ValidationError},
    report_failure,
    selection::{FileCandidate, FileSource, SelectedFile},
    transport::{AnalyzerApi, ProgressFn},
    ClientEvent, Notice,
};

/// The memo extracted from the current file plus the raw text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoContext {
    pub memo: MemoDocument,
    pub full_text: String,
}

/// Who signs the reply. Values are trimmed, nothing else is checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignerInfo {
    pub unit: String,
    pub name: String,
    pub title: String,
}

impl SignerInfo {
    pub fn new(unit: &str, name: &str, title: &str) -> Self {
        Self {
            unit: unit.trim().to_string(),
            name: name.trim().to_string(),
            title: title.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftTab {
    #[default]
    Formal,
    Short,
}

/// A generated reply with editable copies of both drafts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyWorkspace {
    pub draft: ReplyDraft,
    pub formal_text: String,
    pub short_text: String,
    pub active_tab: DraftTab,
}

impl ReplyWorkspace {
    fn new(draft: ReplyDraft) -> Self {
        Self {
            formal_text: draft.konsep_formal.clone(),
            short_text: draft.konsep_singkat.clone(),
            draft,
            active_tab: DraftTab::default(),
        }
    }

    pub fn active_text(&self) -> &str {
        match self.active_tab {
            DraftTab::Formal => &self.formal_text,
            DraftTab::Short => &self.short_text,
        }
    }
}

pub trait ClipboardSink: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), String>;
}

#[derive(Default)]
struct MemoState {
    selected: Option<SelectedFile>,
    context: Option<MemoContext>,
    reply: Option<ReplyWorkspace>,
    /// Moves on select, clear and every extraction.
    generation: u64,
    /// Moves on every reply request.
    reply_seq: u64,
}

pub struct MemoWorkflow {
    api: Arc<dyn AnalyzerApi>,
    events: broadcast::Sender<ClientEvent>,
    inner: Mutex<MemoState>,
}

impl MemoWorkflow {
    pub fn new(api: Arc<dyn AnalyzerApi>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            api,
            events,
            inner: Mutex::new(MemoState::default()),
        }
    }

    pub async fn context(&self) -> Option<MemoContext> {
        self.inner.lock().await.context.clone()
    }

    pub async fn reply(&self) -> Option<ReplyWorkspace> {
        self.inner.lock().await.reply.clone()
    }

    pub async fn select(&self, candidate: FileCandidate, source: FileSource) -> ClientResult<()> {
        let selected = match SelectedFile::try_from(candidate) {
            Ok(selected) => selected,
            Err(err) => return self.reject(Operation::ExtractText, err),
        };
        debug!(
            filename = selected.name(),
            source = source.as_str(),
            "memo: file selected"
        );
        let label = selected.display_label();
        {
            let mut guard = self.inner.lock().await;
            guard.selected = Some(selected);
            reset_memo(&mut guard);
        }
        let _ = self.events.send(ClientEvent::SelectionChanged(Some(label)));
        let _ = self.events.send(ClientEvent::MemoCleared);
        Ok(())
    }

    pub async fn clear(&self) {
        {
            let mut guard = self.inner.lock().await;
            guard.selected = None;
            reset_memo(&mut guard);
        }
        let _ = self.events.send(ClientEvent::SelectionChanged(None));
        let _ = self.events.send(ClientEvent::MemoCleared);
    }

    /// Extracts raw text, then the structured memo. The second request is
    /// only issued once the first succeeded.
    pub async fn extract(&self) -> ClientResult<MemoContext> {
        let (file, generation) = {
            let mut guard = self.inner.lock().await;
            let Some(file) = guard.selected.clone() else {
                drop(guard);
                return self.reject(Operation::ExtractText, ValidationError::NoSelection);
            };
            guard.generation += 1;
            (file, guard.generation)
        };

        let progress: ProgressFn = {
            let events = self.events.clone();
            Arc::new(move |percent| {
                let _ = events.send(ClientEvent::UploadProgress { percent });
            })
        };

        info!(filename = file.name(), "memo: extracting text");
        let full_text = match self.api.upload(&file, Some(progress)).await {
            Ok(result) => result.full_text,
            Err(err) => return self.fail(Operation::ExtractText, err),
        };
        if !self.is_current(generation).await {
            return self.fail(Operation::ExtractText, ClientError::Superseded);
        }
        if full_text.trim().is_empty() {
            return self.reject(Operation::ExtractText, ValidationError::EmptyText);
        }

        info!(chars = full_text.len(), "memo: extracting structure");
        let memo = match self.api.extract_memo(&full_text).await {
            Ok(memo) => memo,
            Err(err) => return self.fail(Operation::ExtractMemo, err),
        };

        let context = MemoContext { memo, full_text };
        {
            let mut guard = self.inner.lock().await;
            if guard.generation != generation {
                drop(guard);
                return self.fail(Operation::ExtractMemo, ClientError::Superseded);
            }
            guard.context = Some(context.clone());
            guard.reply = None;
        }

        let _ = self
            .events
            .send(ClientEvent::MemoExtracted(Box::new(context.clone())));
        emit_notice(&self.events, Notice::success("Nota Dinas berhasil diekstrak!"));
        Ok(context)
    }

    pub async fn generate_reply(&self, signer: SignerInfo) -> ClientResult<ReplyWorkspace> {
        let (request, generation, seq) = {
            let mut guard = self.inner.lock().await;
            let Some(context) = guard.context.as_ref() else {
                drop(guard);
                return self.reject(Operation::GenerateReply, ValidationError::NoMemoContext);
            };
            let request = GenerateReplyRequest {
                nota_dinas_data: context.memo.clone(),
                text: context.full_text.clone(),
                unit_pembalas: signer.unit.trim().to_string(),
                nama_ttd: signer.name.trim().to_string(),
                jabatan_ttd: signer.title.trim().to_string(),
            };
            guard.reply_seq += 1;
            (request, guard.generation, guard.reply_seq)
        };

        info!(unit = %request.unit_pembalas, "memo: generating reply draft");
        let draft = match self.api.generate_reply(&request).await {
            Ok(draft) => draft,
            Err(err) => return self.fail(Operation::GenerateReply, err),
        };

        let workspace = ReplyWorkspace::new(draft);
        {
            let mut guard = self.inner.lock().await;
            if guard.generation != generation || guard.reply_seq != seq {
                drop(guard);
                return self.fail(Operation::GenerateReply, ClientError::Superseded);
            }
            guard.reply = Some(workspace.clone());
        }

        let _ = self
            .events
            .send(ClientEvent::ReplyDraftReady(Box::new(workspace.draft.clone())));
        emit_notice(&self.events, Notice::success("Konsep balasan berhasil dibuat!"));
        Ok(workspace)
    }

    pub async fn select_draft_tab(&self, tab: DraftTab) {
        if let Some(reply) = self.inner.lock().await.reply.as_mut() {
            reply.active_tab = tab;
        }
    }

    pub async fn edit_draft(&self, tab: DraftTab, text: impl Into<String>) {
        if let Some(reply) = self.inner.lock().await.reply.as_mut() {
            match tab {
                DraftTab::Formal => reply.formal_text = text.into(),
                DraftTab::Short => reply.short_text = text.into(),
            }
        }
    }

    /// Copies whichever draft tab is visible, including local edits.
    pub async fn copy_active_draft(&self, clipboard: &dyn ClipboardSink) -> ClientResult<String> {
        let text = {
            let guard = self.inner.lock().await;
            let Some(reply) = guard.reply.as_ref() else {
                drop(guard);
                return self.reject(Operation::CopyDraft, ValidationError::NoReplyDraft);
            };
            reply.active_text().to_string()
        };

        if let Err(reason) = clipboard.set_text(&text) {
            return self.fail(Operation::CopyDraft, ClientError::Clipboard(reason));
        }
        emit_notice(&self.events, Notice::success("Konsep disalin ke clipboard."));
        Ok(text)
    }

    async fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().await.generation == generation
    }

    fn reject<T>(&self, operation: Operation, err: ValidationError) -> ClientResult<T> {
        self.fail(operation, ClientError::from(err))
    }

    fn fail<T>(&self, operation: Operation, err: ClientError) -> ClientResult<T> {
        report_failure(&self.events, operation, &err);
        Err(err)
    }
}

fn reset_memo(state: &mut MemoState) {
    state.context = None;
    state.reply = None;
    state.generation += 1;
}

#[cfg(test)]
#[path = "tests/memo_tests.rs"]
mod tests;

//! Upload/analyze session: file selection, analysis, save and regenerate.
//!
//! State lives behind one mutex and is never held across a request. Every
//! request captures a counter when it is issued and applies its response only
//! if that counter is still current:
//!
//! * `analysis_generation` moves on select, clear and at the start of every
//!   analyze/regenerate, so only the newest analysis-producing request lands.
//! * `lineage_epoch` moves on select, clear and whenever an analyze result
//!   replaces the held analysis, so a save only attaches its id to the
//!   analysis it was issued for. Regenerate keeps the lineage.

use std::sync::Arc;

use shared::{
    domain::DocumentId,
    protocol::{AnalysisResult, RegenerateRequest, SaveDocumentRequest},
};
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

const UNKNOWN_FILENAME: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultTab {
    #[default]
    Summary,
    Keywords,
    Entities,
    Enriched,
    FullText,
}

impl ResultTab {
    pub const ALL: [ResultTab; 5] = [
        ResultTab::Summary,
        ResultTab::Keywords,
        ResultTab::Entities,
        ResultTab::Enriched,
        ResultTab::FullText,
    ];
}

/// Read-only copy of the session for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub selected: Option<SelectedFile>,
    pub analysis: Option<AnalysisResult>,
    pub saved_doc_id: Option<DocumentId>,
    pub edited_text: String,
    pub active_tab: ResultTab,
    pub result_visible: bool,
    pub analyze_in_flight: bool,
}

impl SessionSnapshot {
    pub fn analyze_enabled(&self) -> bool {
        self.selected.is_some() && !self.analyze_in_flight
    }

    pub fn save_enabled(&self) -> bool {
        self.analysis.is_some()
    }
}

#[derive(Default)]
struct SessionState {
    selected: Option<SelectedFile>,
    analysis: Option<AnalysisResult>,
    saved_doc_id: Option<DocumentId>,
    edited_text: String,
    active_tab: ResultTab,
    result_visible: bool,
    /// Generation of the analyze request currently in flight.
    analyze_token: Option<u64>,
    lineage_epoch: u64,
    analysis_generation: u64,
}

impl SessionState {
    /// Drops everything derived from the previous selection. Returns whether
    /// an analyze was in flight.
    fn reset_downstream(&mut self) -> bool {
        self.analysis = None;
        self.saved_doc_id = None;
        self.edited_text.clear();
        self.active_tab = ResultTab::default();
        self.result_visible = false;
        self.lineage_epoch += 1;
        self.analysis_generation += 1;
        self.analyze_token.take().is_some()
    }

    /// Starts a new lineage: ids saved for the previous analysis no longer
    /// apply.
    fn replace_analysis(&mut self, analysis: AnalysisResult) {
        self.saved_doc_id = None;
        self.lineage_epoch += 1;
        self.show_analysis(analysis);
    }

    fn show_analysis(&mut self, analysis: AnalysisResult) {
        self.edited_text = analysis.full_text.clone();
        self.analysis = Some(analysis);
        self.active_tab = ResultTab::default();
        self.result_visible = true;
    }
}

pub struct AnalysisSession {
    api: Arc<dyn AnalyzerApi>,
    events: broadcast::Sender<ClientEvent>,
    inner: Mutex<SessionState>,
}

impl AnalysisSession {
    pub fn new(api: Arc<dyn AnalyzerApi>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            api,
            events,
            inner: Mutex::new(SessionState::default()),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.inner.lock().await;
        SessionSnapshot {
            selected: guard.selected.clone(),
            analysis: guard.analysis.clone(),
            saved_doc_id: guard.saved_doc_id,
            edited_text: guard.edited_text.clone(),
            active_tab: guard.active_tab,
            result_visible: guard.result_visible,
            analyze_in_flight: guard.analyze_token.is_some(),
        }
    }

    /// Validates and selects a file. A rejected file leaves the current
    /// selection untouched.
    pub async fn select(&self, candidate: FileCandidate, source: FileSource) -> ClientResult<()> {
        let selected = match SelectedFile::try_from(candidate) {
            Ok(selected) => selected,
            Err(err) => return self.reject(Operation::Analyze, err),
        };
        debug!(
            filename = selected.name(),
            size = selected.size(),
            source = source.as_str(),
            "file selected"
        );

        let label = selected.display_label();
        let was_busy = {
            let mut guard = self.inner.lock().await;
            guard.selected = Some(selected);
            guard.reset_downstream()
        };
        self.emit_reset(Some(label), was_busy);
        Ok(())
    }

    /// Uses the first of several offered files; an empty offer is a no-op.
    pub async fn select_first(
        &self,
        candidates: Vec<FileCandidate>,
        source: FileSource,
    ) -> ClientResult<()> {
        match candidates.into_iter().next() {
            Some(candidate) => self.select(candidate, source).await,
            None => Ok(()),
        }
    }

    pub async fn clear(&self) {
        let was_busy = {
            let mut guard = self.inner.lock().await;
            guard.selected = None;
            guard.reset_downstream()
        };
        self.emit_reset(None, was_busy);
    }

    pub async fn select_tab(&self, tab: ResultTab) {
        self.inner.lock().await.active_tab = tab;
    }

    /// Replaces the editable full text. The held analysis goes stale but is
    /// kept until the next regenerate.
    pub async fn set_edited_text(&self, text: impl Into<String>) {
        self.inner.lock().await.edited_text = text.into();
    }

    pub async fn analyze(&self) -> ClientResult<AnalysisResult> {
        let (file, generation) = {
            let mut guard = self.inner.lock().await;
            let Some(file) = guard.selected.clone() else {
                drop(guard);
                return self.reject(Operation::Analyze, ValidationError::NoSelection);
            };
            if guard.analyze_token.is_some() {
                drop(guard);
                return self.reject(Operation::Analyze, ValidationError::AnalysisInProgress);
            }
            guard.analysis_generation += 1;
            guard.analyze_token = Some(guard.analysis_generation);
            guard.saved_doc_id = None;
            if let Some(analysis) = guard.analysis.as_mut() {
                analysis.doc_id = None;
            }
            (file, guard.analysis_generation)
        };

        let _ = self.events.send(ClientEvent::AnalyzeBusy(true));
        info!(filename = file.name(), size = file.size(), "analyze: uploading");

        let progress: ProgressFn = {
            let events = self.events.clone();
            Arc::new(move |percent| {
                let _ = events.send(ClientEvent::UploadProgress { percent });
            })
        };
        let outcome = self.api.upload(&file, Some(progress)).await;

        let outcome = {
            let mut guard = self.inner.lock().await;
            if guard.analyze_token == Some(generation) {
                guard.analyze_token = None;
                let _ = self.events.send(ClientEvent::AnalyzeBusy(false));
            }
            match outcome {
                Ok(_) if guard.analysis_generation != generation => Err(ClientError::Superseded),
                Ok(analysis) => {
                    guard.replace_analysis(analysis.clone());
                    Ok(analysis)
                }
                Err(err) => Err(err),
            }
        };

        match outcome {
            Ok(analysis) => {
                info!(filename = %analysis.filename, "analyze: result applied");
                let _ = self
                    .events
                    .send(ClientEvent::AnalysisUpdated(Box::new(analysis.clone())));
                emit_notice(&self.events, Notice::success("Analisis selesai!"));
                Ok(analysis)
            }
            Err(err) => {
                report_failure(&self.events, Operation::Analyze, &err);
                Err(err)
            }
        }
    }

    /// Persists the current analysis and records the returned id.
    pub async fn save(&self) -> ClientResult<DocumentId> {
        let (request, epoch) = {
            let guard = self.inner.lock().await;
            let Some(analysis) = guard.analysis.as_ref() else {
                drop(guard);
                return self.reject(Operation::Save, ValidationError::NoAnalysis);
            };
            (SaveDocumentRequest::from(analysis), guard.lineage_epoch)
        };

        let outcome = match self.api.save(&request).await {
            Ok(record) => {
                let mut guard = self.inner.lock().await;
                if guard.lineage_epoch != epoch {
                    Err(ClientError::Superseded)
                } else {
                    guard.saved_doc_id = Some(record.id);
                    if let Some(analysis) = guard.analysis.as_mut() {
                        analysis.doc_id = Some(record.id);
                    }
                    Ok(record.id)
                }
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(id) => {
                info!(doc_id = id.0, "save: document stored");
                let _ = self.events.send(ClientEvent::DocumentSaved(id));
                emit_notice(
                    &self.events,
                    Notice::success(format!("Dokumen disimpan (ID: {id})")),
                );
                Ok(id)
            }
            Err(err) => {
                report_failure(&self.events, Operation::Save, &err);
                Err(err)
            }
        }
    }

    /// Re-runs analysis over the edited text, targeting the saved document
    /// if there is one.
    pub async fn regenerate(&self) -> ClientResult<AnalysisResult> {
        let doc_id = self.inner.lock().await.saved_doc_id;
        self.regenerate_for(doc_id).await
    }

    pub async fn regenerate_for(&self, doc_id: Option<DocumentId>) -> ClientResult<AnalysisResult> {
        let (request, generation) = {
            let mut guard = self.inner.lock().await;
            let text = guard.edited_text.trim().to_string();
            if text.is_empty() {
                drop(guard);
                return self.reject(Operation::Regenerate, ValidationError::EmptyText);
            }
            let filename = guard
                .analysis
                .as_ref()
                .map(|analysis| analysis.filename.clone())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNKNOWN_FILENAME.to_string());
            guard.analysis_generation += 1;
            (
                RegenerateRequest {
                    full_text: text,
                    filename,
                    doc_id,
                },
                guard.analysis_generation,
            )
        };

        emit_notice(&self.events, Notice::info("Menganalisis ulang..."));
        info!(
            filename = %request.filename,
            doc_id = ?request.doc_id.map(|id| id.0),
            "regenerate: requesting"
        );

        let outcome = match self.api.regenerate(&request).await {
            Ok(patch) => {
                let mut guard = self.inner.lock().await;
                if guard.analysis_generation != generation {
                    Err(ClientError::Superseded)
                } else {
                    let keeps_edit = patch.full_text.is_none();
                    let mut merged = guard.analysis.take().unwrap_or_default();
                    merged.apply_patch(patch);
                    if keeps_edit {
                        merged.full_text = request.full_text.clone();
                    }
                    if merged.doc_id.is_some() {
                        guard.saved_doc_id = merged.doc_id;
                    }
                    guard.show_analysis(merged.clone());
                    Ok(merged)
                }
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(analysis) => {
                let _ = self
                    .events
                    .send(ClientEvent::AnalysisUpdated(Box::new(analysis.clone())));
                emit_notice(&self.events, Notice::success("Generate ulang selesai!"));
                Ok(analysis)
            }
            Err(err) => {
                report_failure(&self.events, Operation::Regenerate, &err);
                Err(err)
            }
        }
    }

    /// Saves, then regenerates against the id the save returned. The
    /// regenerate is never issued if the save fails.
    pub async fn save_then_regenerate(&self) -> ClientResult<AnalysisResult> {
        let id = self.save().await?;
        self.regenerate_for(Some(id)).await
    }

    fn reject<T>(&self, operation: Operation, err: ValidationError) -> ClientResult<T> {
        let err = ClientError::from(err);
        report_failure(&self.events, operation, &err);
        Err(err)
    }

    fn emit_reset(&self, label: Option<String>, was_busy: bool) {
        if was_busy {
            let _ = self.events.send(ClientEvent::AnalyzeBusy(false));
        }
        let _ = self.events.send(ClientEvent::SelectionChanged(label));
        let _ = self.events.send(ClientEvent::AnalysisCleared);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

//! Pure rendering from the data model to display structures.
//!
//! Nothing here touches state or the network. Every view also implements
//! `Display` for plain-text front ends.

use std::fmt;

use chrono::{DateTime, Utc};
use shared::{
    domain::{DocumentId, Priority, Sentiment},
    protocol::{AnalysisResult, DocumentRecord, Entity, MemoDocument, ReplyDraft},
};

use crate::session::ResultTab;

pub const NOT_DETECTED: &str = "Tidak terdeteksi";
pub const EMPTY_MARK: &str = "—";
const NO_SUMMARY: &str = "Tidak ada ringkasan.";
const NO_KEYWORDS: &str = "Tidak ada kata kunci.";
const NO_ENTITIES: &str = "Tidak ada entitas.";
const UNKNOWN_FILE: &str = "Unknown";

/// Number of distinct keyword chip colors; chips cycle through them.
pub const KEYWORD_PALETTE_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
}

impl From<Option<Sentiment>> for Tone {
    fn from(sentiment: Option<Sentiment>) -> Self {
        match sentiment {
            Some(Sentiment::Positive) => Tone::Positive,
            Some(Sentiment::Negative) => Tone::Negative,
            _ => Tone::Neutral,
        }
    }
}

fn sentiment_label(sentiment: Option<Sentiment>) -> &'static str {
    sentiment.map(Sentiment::as_str).unwrap_or(EMPTY_MARK)
}

fn or_mark(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => EMPTY_MARK.to_string(),
    }
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|ts| ts.format("%d/%m/%Y %H.%M.%S").to_string())
        .unwrap_or_else(|| EMPTY_MARK.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordChip {
    pub text: String,
    pub palette_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRow {
    pub label: String,
    pub text: String,
    pub description: String,
}

impl From<&Entity> for EntityRow {
    fn from(entity: &Entity) -> Self {
        Self {
            label: entity.label.clone(),
            text: entity.text.clone(),
            description: entity.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisView {
    pub filename: String,
    pub sentiment_badge: String,
    pub tone: Tone,
    pub summary: String,
    pub keywords: Vec<KeywordChip>,
    pub entities: Vec<EntityRow>,
    pub enriched_info: String,
    pub full_text: String,
    pub doc_id: Option<DocumentId>,
}

pub fn render_analysis(analysis: &AnalysisResult) -> AnalysisView {
    AnalysisView {
        filename: if analysis.filename.is_empty() {
            UNKNOWN_FILE.to_string()
        } else {
            analysis.filename.clone()
        },
        sentiment_badge: format!("Sentimen: {}", sentiment_label(analysis.sentiment)),
        tone: Tone::from(analysis.sentiment),
        summary: if analysis.summary.trim().is_empty() {
            NO_SUMMARY.to_string()
        } else {
            analysis.summary.clone()
        },
        keywords: analysis
            .keywords
            .iter()
            .enumerate()
            .map(|(i, text)| KeywordChip {
                text: text.clone(),
                palette_index: i % KEYWORD_PALETTE_SIZE,
            })
            .collect(),
        entities: analysis.entities.iter().map(EntityRow::from).collect(),
        enriched_info: analysis.enriched_info.clone(),
        full_text: analysis.full_text.clone(),
        doc_id: analysis.doc_id,
    }
}

impl AnalysisView {
    /// Text of a single result tab.
    pub fn section(&self, tab: ResultTab) -> String {
        match tab {
            ResultTab::Summary => self.summary.clone(),
            ResultTab::Keywords if self.keywords.is_empty() => NO_KEYWORDS.to_string(),
            ResultTab::Keywords => self
                .keywords
                .iter()
                .map(|k| k.text.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            ResultTab::Entities if self.entities.is_empty() => NO_ENTITIES.to_string(),
            ResultTab::Entities => self
                .entities
                .iter()
                .map(|e| format!("{}\t{}\t{}", e.label, e.text, e.description))
                .collect::<Vec<_>>()
                .join("\n"),
            ResultTab::Enriched => self.enriched_info.clone(),
            ResultTab::FullText => self.full_text.clone(),
        }
    }
}

impl fmt::Display for AnalysisView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.filename)?;
        writeln!(f, "[{}]", self.sentiment_badge)?;
        if let Some(id) = self.doc_id {
            writeln!(f, "Tersimpan sebagai ID {id}")?;
        }
        writeln!(f)?;
        writeln!(f, "Ringkasan:\n{}", self.summary)?;
        writeln!(f)?;
        if self.keywords.is_empty() {
            writeln!(f, "Kata kunci: {NO_KEYWORDS}")?;
        } else {
            let chips: Vec<String> = self.keywords.iter().map(|k| format!("[{}]", k.text)).collect();
            writeln!(f, "Kata kunci: {}", chips.join(" "))?;
        }
        writeln!(f)?;
        if self.entities.is_empty() {
            writeln!(f, "Entitas: {NO_ENTITIES}")?;
        } else {
            writeln!(f, "Entitas:")?;
            for entity in &self.entities {
                writeln!(f, "  {:<16} {}  ({})", entity.label, entity.text, entity.description)?;
            }
        }
        if !self.enriched_info.is_empty() {
            writeln!(f)?;
            writeln!(f, "Informasi tambahan:\n{}", self.enriched_info)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileIcon {
    Pdf,
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub id: DocumentId,
    pub icon: FileIcon,
    pub filename: String,
    pub file_type: String,
    pub sentiment: String,
    pub tone: Tone,
    pub created_at: String,
}

pub fn render_history_row(doc: &DocumentRecord) -> HistoryRow {
    let file_type = doc.file_type.as_deref();
    HistoryRow {
        id: doc.id,
        icon: if file_type == Some("pdf") {
            FileIcon::Pdf
        } else {
            FileIcon::Document
        },
        filename: doc.filename.clone(),
        file_type: or_mark(file_type),
        sentiment: sentiment_label(doc.sentiment).to_string(),
        tone: Tone::from(doc.sentiment),
        created_at: format_timestamp(doc.created_at),
    }
}

impl fmt::Display for HistoryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = match self.icon {
            FileIcon::Pdf => "PDF",
            FileIcon::Document => "DOC",
        };
        write!(
            f,
            "#{:<5} [{icon}] {}  · {} · {}",
            self.id.0, self.filename, self.sentiment, self.created_at
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDetailView {
    pub title: String,
    pub file_type: String,
    pub sentiment: String,
    pub tone: Tone,
    pub created_at: String,
    pub summary: String,
    pub keywords: String,
    pub entities: Vec<String>,
    pub text_preview: String,
}

pub fn render_document_detail(doc: &DocumentRecord) -> DocumentDetailView {
    let keywords = doc.keywords.join(", ");
    DocumentDetailView {
        title: doc.filename.clone(),
        file_type: or_mark(doc.file_type.as_deref()).to_uppercase(),
        sentiment: sentiment_label(doc.sentiment).to_string(),
        tone: Tone::from(doc.sentiment),
        created_at: format_timestamp(doc.created_at),
        summary: or_mark(doc.summary.as_deref()),
        keywords: or_mark(Some(&keywords)),
        entities: doc
            .entities
            .iter()
            .map(|e| format!("{} ({})", e.text, e.label))
            .collect(),
        text_preview: or_mark(Some(&doc.original_text)),
    }
}

impl fmt::Display for DocumentDetailView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.title)?;
        writeln!(f, "File Type : {}", self.file_type)?;
        writeln!(f, "Sentimen  : {}", self.sentiment)?;
        writeln!(f, "Dibuat    : {}", self.created_at)?;
        writeln!(f)?;
        writeln!(f, "Ringkasan:\n{}", self.summary)?;
        writeln!(f)?;
        writeln!(f, "Kata Kunci: {}", self.keywords)?;
        if self.entities.is_empty() {
            writeln!(f, "Entitas: {EMPTY_MARK}")?;
        } else {
            writeln!(f, "Entitas: {}", self.entities.join(", "))?;
        }
        writeln!(f)?;
        writeln!(f, "Cuplikan Teks:\n{}", self.text_preview)
    }
}

/// One memo field. `lines` is never empty: missing values become
/// [`NOT_DETECTED`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoSection {
    pub title: &'static str,
    pub lines: Vec<String>,
    pub detected: bool,
}

impl MemoSection {
    fn scalar(title: &'static str, value: Option<&String>) -> Self {
        match value.map(|v| v.trim()).filter(|v| !v.is_empty()) {
            Some(v) => Self {
                title,
                lines: vec![v.to_string()],
                detected: true,
            },
            None => Self::missing(title),
        }
    }

    fn list(title: &'static str, values: &[String]) -> Self {
        let lines: Vec<String> = values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        if lines.is_empty() {
            Self::missing(title)
        } else {
            Self {
                title,
                lines,
                detected: true,
            }
        }
    }

    fn missing(title: &'static str) -> Self {
        Self {
            title,
            lines: vec![NOT_DETECTED.to_string()],
            detected: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoView {
    pub sections: Vec<MemoSection>,
}

pub fn render_memo(memo: &MemoDocument) -> MemoView {
    MemoView {
        sections: vec![
            MemoSection::scalar("Nomor", memo.nomor.as_ref()),
            MemoSection::scalar("Hal", memo.hal.as_ref()),
            MemoSection::scalar("Sifat", memo.sifat.as_ref()),
            MemoSection::scalar("Lampiran", memo.lampiran.as_ref()),
            MemoSection::scalar("Dari", memo.dari.as_ref()),
            MemoSection::scalar("Tanggal", memo.tanggal.as_ref()),
            MemoSection::scalar("Penandatangan", memo.penandatangan.as_ref()),
            MemoSection::scalar("Jabatan Penandatangan", memo.jabatan_penandatangan.as_ref()),
            MemoSection::scalar("Unit Asal", memo.unit_asal.as_ref()),
            MemoSection::scalar("Jenis Dokumen", memo.jenis_dokumen.as_ref()),
            MemoSection::list("Deadline", &memo.deadline),
            MemoSection::list("Kepada", &memo.kepada),
            MemoSection::list("Isi Pokok", &memo.isi_pokok),
            MemoSection::list("Poin Penting", &memo.poin_penting),
            MemoSection::list("Referensi Regulasi", &memo.referensi_regulasi),
            MemoSection::list("Tembusan", &memo.tembusan),
        ],
    }
}

impl fmt::Display for MemoView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            if let [only] = section.lines.as_slice() {
                writeln!(f, "{:<22}: {only}", section.title)?;
            } else {
                writeln!(f, "{}:", section.title)?;
                for line in &section.lines {
                    writeln!(f, "  - {line}")?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistRow {
    pub item: String,
    pub label: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyView {
    /// Reply metadata, in display order. Missing values are omitted.
    pub header: Vec<(&'static str, String)>,
    pub points: Vec<String>,
    pub formal: String,
    pub short: String,
    pub checklist: Vec<ChecklistRow>,
}

pub fn render_reply(draft: &ReplyDraft) -> ReplyView {
    let header = [
        ("Nomor", &draft.nomor_balasan),
        ("Kepada", &draft.penerima),
        ("Tanggal", &draft.tanggal),
        ("Tindakan", &draft.action_type),
    ]
    .into_iter()
    .filter_map(|(title, value)| {
        let value = value.as_deref()?.trim();
        (!value.is_empty()).then(|| (title, value.to_string()))
    })
    .collect();

    ReplyView {
        header,
        points: draft.poin_balasan.clone(),
        formal: draft.konsep_formal.clone(),
        short: draft.konsep_singkat.clone(),
        checklist: draft
            .checklist_aksi
            .iter()
            .map(|entry| ChecklistRow {
                item: entry.item.clone(),
                label: or_mark(Some(&entry.prioritas)),
                priority: entry.priority(),
            })
            .collect(),
    }
}

impl fmt::Display for ReplyView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (title, value) in &self.header {
            writeln!(f, "{title:<9}: {value}")?;
        }
        if !self.points.is_empty() {
            writeln!(f, "Poin balasan:")?;
            for point in &self.points {
                writeln!(f, "  - {point}")?;
            }
        }
        writeln!(f, "Checklist aksi:")?;
        if self.checklist.is_empty() {
            writeln!(f, "  {EMPTY_MARK}")?;
        }
        for row in &self.checklist {
            writeln!(f, "  {row}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ChecklistRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.priority {
            Priority::High => "!",
            Priority::Normal => " ",
        };
        write!(f, "[{marker}] {} ({})", self.item, self.label)
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;

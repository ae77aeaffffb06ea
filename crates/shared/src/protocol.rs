use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{DocumentId, Priority, Sentiment};

/// Accepts `null` wherever the backend may omit a value and falls back to
/// the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The backend emits ISO-8601 timestamps that may or may not carry an offset.
/// Naive values are taken as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// Result of `POST /api/upload`. Extra response keys (`status`,
/// `original_text`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub filename: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub enriched_info: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<DocumentId>,
}

impl AnalysisResult {
    /// Shallow merge: every field present in `patch` replaces the held value,
    /// absent fields are kept.
    pub fn apply_patch(&mut self, patch: AnalysisPatch) {
        let AnalysisPatch {
            filename,
            full_text,
            summary,
            keywords,
            entities,
            sentiment,
            enriched_info,
            file_type,
            doc_id,
            document,
            status: _,
        } = patch;

        if let Some(v) = filename {
            self.filename = v;
        }
        if let Some(v) = full_text {
            self.full_text = v;
        }
        if let Some(v) = summary {
            self.summary = v;
        }
        if let Some(v) = keywords {
            self.keywords = v;
        }
        if let Some(v) = entities {
            self.entities = v;
        }
        if let Some(v) = sentiment {
            self.sentiment = Some(v);
        }
        if let Some(v) = enriched_info {
            self.enriched_info = v;
        }
        if let Some(v) = file_type {
            self.file_type = v;
        }
        match (doc_id, document) {
            (Some(id), _) => self.doc_id = Some(id),
            (None, Some(record)) => self.doc_id = Some(record.id),
            (None, None) => {}
        }
    }
}

/// Partial analysis returned by `POST /api/regenerate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Entity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enriched_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<DocumentId>,
    /// Present when the backend also updated a persisted record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDocumentRequest {
    pub filename: String,
    pub full_text: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub entities: Vec<Entity>,
    pub sentiment: Option<Sentiment>,
    pub enriched_info: String,
    pub file_type: String,
}

impl From<&AnalysisResult> for SaveDocumentRequest {
    fn from(analysis: &AnalysisResult) -> Self {
        Self {
            filename: analysis.filename.clone(),
            full_text: analysis.full_text.clone(),
            summary: analysis.summary.clone(),
            keywords: analysis.keywords.clone(),
            entities: analysis.entities.clone(),
            sentiment: analysis.sentiment,
            enriched_info: analysis.enriched_info.clone(),
            file_type: analysis.file_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveDocumentResponse {
    pub document: DocumentRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerateRequest {
    pub full_text: String,
    pub filename: String,
    pub doc_id: Option<DocumentId>,
}

/// A persisted document as returned by the listing and detail endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filename: String,
    /// Preview of the stored text, truncated server-side.
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_text: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub enriched_info: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentListResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub documents: Vec<DocumentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractMemoRequest {
    pub text: String,
}

/// Structured fields of a Nota Dinas. Every field may be missing; the view
/// layer substitutes a "not detected" label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nomor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sifat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lampiran: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dari: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tanggal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penandatangan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jabatan_penandatangan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_asal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jenis_dokumen: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub deadline: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub kepada: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub isi_pokok: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub poin_penting: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub referensi_regulasi: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tembusan: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractMemoResponse {
    pub nota_dinas: MemoDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateReplyRequest {
    pub nota_dinas_data: MemoDocument,
    pub text: String,
    pub unit_pembalas: String,
    pub nama_ttd: String,
    pub jabatan_ttd: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub item: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prioritas: String,
}

impl ChecklistItem {
    pub fn priority(&self) -> Priority {
        Priority::from_label(&self.prioritas)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyDraft {
    #[serde(default, deserialize_with = "null_as_default")]
    pub konsep_formal: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub konsep_singkat: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub checklist_aksi: Vec<ChecklistItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nomor_balasan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penerima: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tanggal: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub poin_balasan: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateReplyResponse {
    pub balasan: ReplyDraft,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;

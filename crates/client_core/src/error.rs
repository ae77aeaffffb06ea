use std::path::PathBuf;

use thiserror::Error;

use crate::{Notice, NoticeLevel};

/// Failures detected before any request is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported file format `{extension}`")]
    UnsupportedFormat { extension: String },
    #[error("file is empty (0 bytes)")]
    EmptyFile,
    #[error("file is {size} bytes, limit is {limit}")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("no file selected")]
    NoSelection,
    #[error("an analysis request is already in flight")]
    AnalysisInProgress,
    #[error("no analysis result to save")]
    NoAnalysis,
    #[error("text to analyze is empty")]
    EmptyText,
    #[error("no extracted memo available")]
    NoMemoContext,
    #[error("no reply draft generated")]
    NoReplyDraft,
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::UnsupportedFormat { .. } => {
                "Format tidak didukung. Gunakan PDF atau DOCX."
            }
            ValidationError::EmptyFile => "File kosong (0 bytes).",
            ValidationError::FileTooLarge { .. } => "File terlalu besar. Maksimal 16MB.",
            ValidationError::NoSelection => "Pilih file terlebih dahulu.",
            ValidationError::AnalysisInProgress => "Analisis masih berjalan.",
            ValidationError::NoAnalysis => "Tidak ada data.",
            ValidationError::EmptyText => "Teks kosong.",
            ValidationError::NoMemoContext => "Ekstrak Nota Dinas terlebih dahulu.",
            ValidationError::NoReplyDraft => "Buat konsep balasan terlebih dahulu.",
        }
    }

    /// Rejected files are reported as errors, missing preconditions as warnings.
    pub fn level(&self) -> NoticeLevel {
        match self {
            ValidationError::UnsupportedFormat { .. }
            | ValidationError::EmptyFile
            | ValidationError::FileTooLarge { .. } => NoticeLevel::Error,
            _ => NoticeLevel::Warning,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("request timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("server responded {status}: {}", message.as_deref().unwrap_or("<no error body>"))]
    Server { status: u16, message: Option<String> },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("failed to read {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
    #[error("response discarded: superseded by a newer request")]
    Superseded,
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl ClientError {
    pub fn is_superseded(&self) -> bool {
        matches!(self, ClientError::Superseded)
    }

    /// The notification a front end should show for this failure, or `None`
    /// for failures that are dropped silently.
    pub fn notice(&self, operation: Operation) -> Option<Notice> {
        let (level, message) = match self {
            ClientError::Validation(err) => (err.level(), err.user_message().to_string()),
            ClientError::Timeout => (NoticeLevel::Error, operation.timeout_message().to_string()),
            ClientError::Server {
                message: Some(message),
                ..
            } if operation.surfaces_server_message() => (NoticeLevel::Error, message.clone()),
            ClientError::Superseded => return None,
            _ => (NoticeLevel::Error, operation.fallback_message().to_string()),
        };
        Some(Notice { level, message })
    }
}

/// Remote operations, each with its own generic failure text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Analyze,
    Save,
    Regenerate,
    History,
    Detail,
    Delete,
    ExtractText,
    ExtractMemo,
    GenerateReply,
    CopyDraft,
    Health,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Analyze => "analyze",
            Operation::Save => "save",
            Operation::Regenerate => "regenerate",
            Operation::History => "history",
            Operation::Detail => "detail",
            Operation::Delete => "delete",
            Operation::ExtractText => "extract_text",
            Operation::ExtractMemo => "extract_memo",
            Operation::GenerateReply => "generate_reply",
            Operation::CopyDraft => "copy_draft",
            Operation::Health => "health",
        }
    }

    pub fn fallback_message(self) -> &'static str {
        match self {
            Operation::Analyze => "Gagal menganalisis dokumen.",
            Operation::Save => "Gagal menyimpan.",
            Operation::Regenerate => "Gagal regenerate.",
            Operation::History => "Gagal memuat riwayat.",
            Operation::Detail => "Gagal memuat detail.",
            Operation::Delete => "Gagal menghapus.",
            Operation::ExtractText => "Gagal mengekstrak teks dokumen.",
            Operation::ExtractMemo => "Gagal mengekstrak data Nota Dinas.",
            Operation::GenerateReply => "Gagal membuat konsep balasan.",
            Operation::CopyDraft => "Gagal menyalin ke clipboard.",
            Operation::Health => "API tidak dapat dihubungi.",
        }
    }

    pub fn timeout_message(self) -> &'static str {
        match self {
            Operation::Analyze | Operation::ExtractText => "Timeout. Coba file yang lebih kecil.",
            _ => "Timeout. Server tidak merespons.",
        }
    }

    /// History, detail and delete failures always use their generic text.
    pub fn surfaces_server_message(self) -> bool {
        !matches!(
            self,
            Operation::History | Operation::Detail | Operation::Delete
        )
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

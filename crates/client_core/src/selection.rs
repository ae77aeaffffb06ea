use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use shared::domain::FileKind;

use crate::error::{ClientError, ClientResult, ValidationError};

pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// How the user handed over a file. Validation is identical for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSource {
    Dialog,
    DragDrop,
}

impl FileSource {
    pub fn as_str(self) -> &'static str {
        match self {
            FileSource::Dialog => "dialog",
            FileSource::DragDrop => "drag_drop",
        }
    }
}

/// A file offered for selection, not yet validated.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ClientError::Io {
                path: path.to_path_buf(),
                reason: "path has no file name".into(),
            })?;
        let bytes = tokio::fs::read(path).await.map_err(|err| ClientError::Io {
            path: PathBuf::from(path),
            reason: err.to_string(),
        })?;
        Ok(Self { name, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// A validated selection. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    kind: FileKind,
    bytes: Arc<Vec<u8>>,
}

impl SelectedFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &'static str {
        self.kind.extension()
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.bytes)
    }

    /// `report.pdf (2048.0 KB)`
    pub fn display_label(&self) -> String {
        format!("{} ({:.1} KB)", self.name, self.size() as f64 / 1024.0)
    }
}

impl TryFrom<FileCandidate> for SelectedFile {
    type Error = ValidationError;

    fn try_from(candidate: FileCandidate) -> Result<Self, Self::Error> {
        let kind = validate_candidate(&candidate.name, candidate.size())?;
        Ok(Self {
            name: candidate.name,
            kind,
            bytes: Arc::new(candidate.bytes),
        })
    }
}

/// Checks, in order: supported extension, non-empty, within the size limit.
pub fn validate_candidate(name: &str, size: u64) -> Result<FileKind, ValidationError> {
    let extension = extension_of(name);
    let kind = FileKind::from_extension(&extension)
        .ok_or(ValidationError::UnsupportedFormat { extension })?;
    if size == 0 {
        return Err(ValidationError::EmptyFile);
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(kind)
}

/// Text after the last dot, lowercased; the whole name when there is no dot.
fn extension_of(name: &str) -> String {
    name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase()
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;

use serde::{Deserialize, Serialize};

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    /// Extracts the `error` string from a raw response body, if the body is
    /// JSON and carries a non-blank one.
    pub fn message_from_bytes(body: &[u8]) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
        let message = parsed.error.trim();
        if message.is_empty() {
            None
        } else {
            Some(message.to_string())
        }
    }
}

//! Error types for engine operations

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors raised by a [`super::SearchEngine`] implementation
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// Request never got a response (connection refused, timeout, TLS)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Engine answered with a non-success status
    #[error("Engine rejected request ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    /// Response body did not have the expected shape
    #[error("Unexpected engine response: {0}")]
    Decode(String),

    /// Client could not be built from the given settings
    #[error("Invalid engine configuration: {0}")]
    InvalidConfiguration(String),
}

impl EngineError {
    pub(crate) fn rejected(status: u16, reason: impl Into<String>) -> Self {
        EngineError::Rejected {
            status,
            reason: reason.into(),
        }
    }

    /// Extract `type: reason` from an Elasticsearch error body, falling back to the raw text
    pub(crate) fn from_error_body(status: u16, body: &str) -> Self {
        let reason = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                let error = value.get("error")?;
                match (error.get("type"), error.get("reason")) {
                    (Some(kind), Some(reason)) => Some(format!(
                        "{}: {}",
                        kind.as_str().unwrap_or_default(),
                        reason.as_str().unwrap_or_default()
                    )),
                    _ => error.as_str().map(str::to_string),
                }
            })
            .unwrap_or_else(|| {
                if body.is_empty() {
                    "empty response body".to_string()
                } else {
                    body.to_string()
                }
            });

        EngineError::Rejected { status, reason }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EngineError::Decode(err.to_string())
        } else {
            EngineError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Decode(err.to_string())
    }
}

use std::time::Duration;

use thiserror::Error;

/// Failure of a single evidence provider call.
///
/// Never crosses the gatherer boundary: every variant is absorbed into an
/// inconclusive evidence item carrying `to_string()` as its reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider} timed out after {after_ms}ms")]
    Timeout { provider: String, after_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Provider rejected request with status {status}")]
    Rejected { status: u16 },
}

impl ProviderError {
    pub fn timeout(provider: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            provider: provider.into(),
            after_ms: after.as_millis() as u64,
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network(_) => true,
            Self::Rejected { status } => *status == 429 || *status >= 500,
            Self::MalformedResponse(_) | Self::Unavailable(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Rejected {
                status: status.as_u16(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Failure of one narrative tier. Handled entirely inside the fallback chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NarrativeError {
    #[error("Narrative generator unavailable: {0}")]
    Unavailable(String),

    #[error("Narrative request failed: {0}")]
    Request(String),

    #[error("Narrative generator returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for NarrativeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Evidence store error: {0}")]
    Store(String),

    #[error("Invalid case state for {case_id}: case is {status}")]
    InvalidState { case_id: String, status: String },

    #[error("Invalid state transition: {from} -> {to} (allowed: {allowed})")]
    InvalidTransition {
        from: String,
        to: String,
        allowed: String,
    },

    #[error("Case not found: {0}")]
    CaseNotFound(String),

    #[error("Case already exists: {0}")]
    CaseAlreadyExists(String),

    #[error("Case {case_id} failed: {reason}")]
    CaseFailed { case_id: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl EngineError {
    /// Store-level failures are the only errors that fail a case.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Io(_) | Self::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

use std::sync::Arc;

use thiserror::Error;

/// Session core error types
#[derive(Error, Debug)]
pub enum AuthError {
    /// No response at all. Never treated as an authentication failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error {status}: {body_snippet}")]
    Http {
        status: reqwest::StatusCode,
        body_snippet: String,
    },

    /// A 401 that the pipeline refused to refresh (auth endpoint or already retried)
    #[error("Unauthorized: {body_snippet}")]
    Unauthorized { body_snippet: String },

    /// The refresh itself failed; tokens were cleared before this was returned
    #[error("Session expired: {0}")]
    SessionExpired(#[from] RefreshError),

    #[error("Token storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("JSON serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Status code of the failed response, if there was one
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(reqwest::StatusCode::UNAUTHORIZED),
            Self::Network(e) => e.status(),
            _ => None,
        }
    }
}

/// Failure of the shared refresh operation.
///
/// Every request waiting on the same refresh observes the same value, so the
/// type is cheap to clone.
#[derive(Error, Debug, Clone)]
pub enum RefreshError {
    #[error("Refresh rejected by server ({status})")]
    Rejected { status: reqwest::StatusCode },

    #[error("Refresh request failed: {0}")]
    Transport(Arc<reqwest::Error>),

    #[error("Missing refresh token - cannot refresh session")]
    MissingRefreshToken,

    /// The session was ended while the request was in flight
    #[error("Session was cleared while the request was in flight")]
    SessionCleared,

    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),

    #[error("Failed to store refreshed tokens: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for RefreshError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Arc::new(err))
    }
}

/// Persistent token storage failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Stored token data is corrupted or unreadable with the current key")]
    CorruptedStore,

    #[error("Token storage is locked by another process")]
    Locked,

    #[error("Failed to encode stored record: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

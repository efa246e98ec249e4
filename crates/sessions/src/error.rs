//! Error types for the session client.

use {reqwest::StatusCode, thiserror::Error};

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by [`crate::SessionClient`] and [`crate::KeepAlive`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The configured session base URL does not parse or cannot carry path segments.
    #[error("invalid session base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The service answered but issued no session (404, empty body or JSON `null`).
    #[error("session service returned no session")]
    NotFound,

    /// The open response body is not a JSON UUID string.
    #[error("malformed session identifier in response: {source}")]
    MalformedIdentifier {
        /// Raw response body, kept for diagnostics.
        body: String,
        source: serde_json::Error,
    },

    /// Ping answered with a non-success status.
    #[error("unsuccessful ping (status {status})")]
    UnsuccessfulPing { status: StatusCode },

    /// Any other non-success status.
    #[error("{operation} failed with status {status}")]
    Status {
        operation: &'static str,
        status: StatusCode,
    },

    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The keep-alive task panicked or was aborted.
    #[error("keep-alive task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SessionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedIdentifier { .. })
    }
}

//! Error types for the directory client.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Accounting for one `execute_multiple` call.
///
/// `queued` is the number of actions still waiting to be flushed after the
/// call, `sent` the number of actions posted to the server during the call,
/// and `completed` the number the server reported as successful. Completed
/// counts are authoritative: they are reported even when a later batch in
/// the same call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStatus {
    /// Actions still queued (not yet flushed).
    pub queued: usize,
    /// Actions sent to the server during this call.
    pub sent: usize,
    /// Actions the server reported as completed.
    pub completed: usize,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} queued, {} sent, {} completed",
            self.queued, self.sent, self.completed
        )
    }
}

/// Directory API error.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// Retries against a transient condition (429/502/503/504 or a network
    /// timeout) were exhausted.
    #[error("service unavailable: made {attempts} attempts over {} seconds", waited.as_secs())]
    Unavailable {
        /// Number of attempts made (1-based count).
        attempts: u32,
        /// Cumulative time spent waiting between attempts.
        waited: Duration,
    },

    /// The server rejected the request (4xx other than 429). Not retried.
    #[error("request error (HTTP {status}): {body}")]
    Request {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Unexpected, non-retryable server failure: any status outside the
    /// success, retryable, and 4xx ranges. Not retried.
    #[error("server error (HTTP {status}): {body}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The response was well-formed HTTP but semantically not understood by
    /// this client (unparseable body, missing `result` key, error records
    /// that do not map back onto the actions sent).
    #[error("server response not understood: {reason}")]
    Client {
        /// What the client could not make sense of.
        reason: String,
        /// The offending response body, when one was parsed.
        body: Option<serde_json::Value>,
    },

    /// One or more batches failed within a single `execute_multiple` call.
    /// Carries whatever partial progress was made.
    #[error("{} batch(es) failed ({status})", causes.len())]
    Batch {
        /// The underlying failures, one per failed batch.
        causes: Vec<DirectoryError>,
        /// Final accounting for the call.
        status: ExecutionStatus,
    },

    /// The caller misused the API surface. Raised before any network I/O.
    #[error("invalid argument: {0}")]
    Argument(String),
}

impl DirectoryError {
    /// Shorthand for a [`DirectoryError::Client`] without a captured body.
    pub fn client(reason: impl Into<String>) -> Self {
        Self::Client {
            reason: reason.into(),
            body: None,
        }
    }

    /// Shorthand for a [`DirectoryError::Client`] that captures the body.
    pub fn client_with_body(reason: impl Into<String>, body: serde_json::Value) -> Self {
        Self::Client {
            reason: reason.into(),
            body: Some(body),
        }
    }

    /// Shorthand for a [`DirectoryError::Argument`].
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    /// HTTP status code, when this error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Returns true for the HTTP statuses the transport retries: the server is
/// temporarily unable to serve the request.
pub fn retryable_status(status: u16) -> bool {
    matches!(status, 429 | 502 | 503 | 504)
}

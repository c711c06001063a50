//! Error types for cadstream-io.

use thiserror::Error;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, IoError>;

/// Errors raised while fetching model data.
///
/// Cloneable so one failed fetch can be handed to every waiter of a shared
/// request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IoError {
    /// The server answered with a non-success status.
    #[error("http status {status} for {url}")]
    Http {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Token acquisition or refresh failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// JSON decoding error.
    #[error("json error: {0}")]
    Json(String),

    /// The provider cannot serve this kind of model.
    #[error("unsupported model source: {0}")]
    UnsupportedSource(String),

    /// No output of the requested format exists for a model revision.
    #[error("no {format} output for {model}")]
    MissingOutput {
        /// Output format name.
        format: String,
        /// Model description.
        model: String,
    },

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,
}

impl IoError {
    /// Non-success HTTP status for `url`.
    pub fn http(status: u16, url: impl Into<String>) -> Self {
        Self::Http {
            status,
            url: url.into(),
        }
    }

    /// Failure below the HTTP layer.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Whether the request was abandoned on cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Status code of an HTTP error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for IoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

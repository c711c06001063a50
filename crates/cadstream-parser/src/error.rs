//! Error types for cadstream-parser.

use thiserror::Error;

/// Result type for sector parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors raised while decoding a sector file.
///
/// [`ParseError::InvalidModel`] means the bytes are not a sector container at
/// all; the other variants mean the container was recognized but its content
/// is inconsistent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Bad magic, unsupported version or truncated container.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// Inconsistent collection description or buffer contents.
    #[error("parse error: {message}")]
    ParseError {
        /// Error message.
        message: String,
        /// Collection being parsed when the error occurred.
        context: Option<String>,
    },

    /// Malformed JSON chunk.
    #[error("json error: {0}")]
    Json(String),
}

impl ParseError {
    /// Input that is not a sector file at all.
    pub fn invalid_model(message: impl Into<String>) -> Self {
        Self::InvalidModel(message.into())
    }

    /// Sector file with inconsistent content.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            context: None,
        }
    }

    /// Create a parse error with context.
    pub fn parse_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Whether the input was not recognized as a sector file.
    pub fn is_invalid_model(&self) -> bool {
        matches!(self, Self::InvalidModel(_))
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

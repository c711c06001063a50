//! Error types for cadstream-loader.

use cadstream_io::IoError;
use cadstream_parser::ParseError;
use cadstream_scene::SceneError;
use thiserror::Error;

/// Errors of a single sector load.
///
/// Cloneable so a coalesced load can report the same error to every waiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    /// Fetching the sector file failed.
    #[error("fetch failed: {0}")]
    Io(IoError),

    /// The sector file could not be decoded.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The load was cancelled. Not a failure.
    #[error("sector load cancelled")]
    Cancelled,
}

impl LoadError {
    /// Whether the load was abandoned on cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether the payload was not a sector file at all.
    pub fn is_invalid_model(&self) -> bool {
        matches!(self, Self::Parse(err) if err.is_invalid_model())
    }
}

impl From<IoError> for LoadError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Cancelled => Self::Cancelled,
            other => Self::Io(other),
        }
    }
}

/// Errors while resolving a model's metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata fetch failed: {0}")]
    Io(#[from] IoError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

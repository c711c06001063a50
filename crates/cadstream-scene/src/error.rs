//! Error types for cadstream-scene.

use thiserror::Error;

/// Result type for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;

/// Errors raised while building or clipping a sector scene.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The sector list does not describe a single rooted tree.
    #[error("malformed sector metadata: {0}")]
    MalformedMetadata(String),

    /// The scene document uses a format version this crate cannot read.
    #[error("unsupported scene version {0}")]
    UnsupportedVersion(u32),

    /// The clip box does not overlap the model at all.
    #[error("clip box does not intersect the model bounds")]
    EmptyClipIntersection,

    /// JSON deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SceneError {
    /// Scene document with inconsistent content.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMetadata(message.into())
    }
}

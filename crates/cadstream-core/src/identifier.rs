//! Model identity.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Output format of a model stored on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModelFormat {
    #[cfg_attr(feature = "serde", serde(rename = "reveal-directory"))]
    RevealCadModel,
    #[cfg_attr(feature = "serde", serde(rename = "gltf-directory"))]
    GltfCadModel,
    #[cfg_attr(feature = "serde", serde(rename = "ept-pointcloud"))]
    EptPointCloud,
}

impl ModelFormat {
    /// Name used by the platform outputs API.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFormat::RevealCadModel => "reveal-directory",
            ModelFormat::GltfCadModel => "gltf-directory",
            ModelFormat::EptPointCloud => "ept-pointcloud",
        }
    }

    /// Parse a platform format name such as `reveal-directory`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "reveal-directory" => Some(ModelFormat::RevealCadModel),
            "gltf-directory" => Some(ModelFormat::GltfCadModel),
            "ept-pointcloud" => Some(ModelFormat::EptPointCloud),
            _ => None,
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a model's data lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelSource {
    /// A path relative to a static file server.
    Local { path: String },
    /// A model revision on the platform's 3D storage.
    Cdf {
        model_id: u64,
        revision_id: u64,
        format: ModelFormat,
    },
}

/// Identity of one loaded model.
///
/// Every constructor draws a fresh process-unique token. Equality and hashing
/// use only the token, so two identifiers created for the same logical model
/// never share cache slots. Clones share the token.
#[derive(Debug, Clone)]
pub struct ModelIdentifier {
    token: u64,
    source: ModelSource,
}

impl ModelIdentifier {
    /// New identifier with a fresh token.
    pub fn new(source: ModelSource) -> Self {
        Self {
            token: NEXT_TOKEN.fetch_add(1, Ordering::Relaxed),
            source,
        }
    }

    /// Model served from a local directory.
    pub fn local(path: impl Into<String>) -> Self {
        Self::new(ModelSource::Local { path: path.into() })
    }

    /// Model revision stored on the cloud platform.
    pub fn cdf(model_id: u64, revision_id: u64, format: ModelFormat) -> Self {
        Self::new(ModelSource::Cdf {
            model_id,
            revision_id,
            format,
        })
    }

    /// Cache-partitioning token.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Where the model is stored.
    pub fn source(&self) -> &ModelSource {
        &self.source
    }
}

impl PartialEq for ModelIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for ModelIdentifier {}

impl Hash for ModelIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            ModelSource::Local { path } => write!(f, "{path}"),
            ModelSource::Cdf {
                model_id,
                revision_id,
                format,
            } => write!(f, "{model_id}/{revision_id}/{format}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_instances_never_collide() {
        let a = ModelIdentifier::local("primitives");
        let b = ModelIdentifier::local("primitives");
        assert_ne!(a, b);
        assert_eq!(a.source(), b.source());
    }

    #[test]
    fn test_clone_shares_identity() {
        let a = ModelIdentifier::cdf(1, 2, ModelFormat::RevealCadModel);
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a.token(), b.token());
    }

    #[test]
    fn test_display() {
        let id = ModelIdentifier::cdf(10, 20, ModelFormat::RevealCadModel);
        assert_eq!(id.to_string(), "10/20/reveal-directory");
        assert_eq!(ModelIdentifier::local("models/a").to_string(), "models/a");
    }

    #[test]
    fn test_format_names() {
        for format in [
            ModelFormat::RevealCadModel,
            ModelFormat::GltfCadModel,
            ModelFormat::EptPointCloud,
        ] {
            assert_eq!(ModelFormat::from_name(format.as_str()), Some(format));
        }
        assert_eq!(ModelFormat::from_name("all-outputs"), None);
    }
}

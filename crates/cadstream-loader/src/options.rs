//! Repository configuration.

use serde::{Deserialize, Serialize};

/// Default cache budget: 256 MiB.
pub const DEFAULT_CACHE_SIZE_BYTES: u64 = 256 * 1024 * 1024;

/// Options for [`crate::CachedSectorRepository`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepositoryOptions {
    /// Total bytes of unreferenced results kept before eviction starts.
    pub cache_size_bytes: u64,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            cache_size_bytes: DEFAULT_CACHE_SIZE_BYTES,
        }
    }
}

impl RepositoryOptions {
    /// Options with the default cache size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache budget in bytes.
    pub fn with_cache_size(mut self, bytes: u64) -> Self {
        self.cache_size_bytes = bytes;
        self
    }
}

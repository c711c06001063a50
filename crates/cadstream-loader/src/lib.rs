//! cadstream-loader: turning wanted sectors into consumed sectors.
//!
//! The [`CachedSectorRepository`] sits between a visibility scheduler and
//! the [`GltfSectorLoader`]. It coalesces concurrent requests for the same
//! sector file, reference counts the results per model and evicts
//! unreferenced results when the cache grows past its budget. Failures of a
//! single sector are downgraded to a discarded result so that one bad file
//! never aborts a batch of loads.
//!
//! [`CadModelMetadataRepository`] resolves a model to its sector scene and
//! placement before any sector is requested.
//!
//! Everything here is single-threaded: state lives in `Rc<RefCell<_>>` and
//! futures are `!Send`.

pub mod error;
pub mod group;
pub mod loader;
pub mod metadata_repository;
pub mod options;
pub mod repository;
pub mod sector;

pub use error::{LoadError, MetadataError};
pub use group::{BasicMaterialManager, MaterialHandle, MaterialManager, RenderableMesh, SectorMeshGroup};
pub use loader::{GltfSectorLoader, SectorLoader};
pub use metadata_repository::{CadModelMetadata, CadModelMetadataRepository};
pub use options::RepositoryOptions;
pub use repository::{CachedSectorRepository, SectorRepository};
pub use sector::{ConsumedSector, LevelOfDetail, ParsedGeometry, WantedSector};

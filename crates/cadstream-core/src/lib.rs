//! Core types shared by every cadstream crate.
//!
//! - [`BoundingBox`] and [`BoundingSphere`] for sector bounds and clip boxes
//! - [`Frustum`] for view-frustum queries
//! - [`ModelIdentifier`] identifying a loaded model and partitioning caches
//! - [`CancellationToken`] threaded through asynchronous loads

pub mod bounds;
pub mod cancel;
pub mod frustum;
pub mod identifier;

pub use bounds::{BoundingBox, BoundingSphere};
pub use cancel::CancellationToken;
pub use frustum::Frustum;
pub use identifier::{ModelFormat, ModelIdentifier, ModelSource};

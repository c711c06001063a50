//! cadstream-parser: decoding of sector geometry files.
//!
//! A sector file is a small binary container holding a JSON description of
//! its geometry collections and one binary chunk with the raw buffers. Each
//! collection is tagged with a [`CollectionType`]:
//!
//! - primitive collections (boxes, cones, tori, ...) store one interleaved
//!   record per instance
//! - instance meshes store a shared mesh plus one transform per instance
//! - triangle meshes, optionally textured, store plain vertex buffers
//!
//! ```ignore
//! use cadstream_parser::{parse_sector, filter_outside_clip_box};
//!
//! let collections = parse_sector(&bytes)?;
//! let kept: Vec<_> = collections
//!     .into_iter()
//!     .filter_map(|c| filter_outside_clip_box(c, &clip_box))
//!     .collect();
//! ```

pub mod collection;
pub mod container;
pub mod error;
pub mod filter;
pub mod reader;
pub mod schema;
pub mod writer;

pub use collection::{
    AttributeLayout, CollectionType, Geometry, GeometryCollection, InstanceBuffer, MeshBuffers,
    Texture, INSTANCE_MATRIX, TREE_INDEX,
};
pub use error::{ParseError, Result};
pub use filter::{filter_outside_clip_box, primitive_bounds};
pub use reader::parse_sector;
pub use writer::SectorWriter;

//! cadstream-scene: the sector tree of a CAD model.
//!
//! A model is split into spatially partitioned sectors arranged as a tree.
//! This crate turns the flat list of sector records found in a model's
//! `scene.json` into a [`SectorScene`], answers spatial queries over it and
//! derives clipped scenes.
//!
//! ```ignore
//! use cadstream_scene::{parse_scene_json, create_clipped_model};
//!
//! let scene = parse_scene_json(&bytes)?;
//! let visible = scene.sectors_intersecting_frustum(&projection, &view);
//! let clipped = create_clipped_model(&scene, &clip_box)?;
//! ```

pub mod clipper;
pub mod document;
pub mod error;
pub mod metadata;
pub mod parser;
pub mod scene;

pub use clipper::create_clipped_model;
pub use document::{SceneDocument, SectorRecord};
pub use error::{Result, SceneError};
pub use metadata::{CoverageFactors, FacesFile, IndexFile, SectorMetadata};
pub use parser::{parse_scene_document, parse_scene_json, parse_scene_value, parse_sectors};
pub use scene::SectorScene;

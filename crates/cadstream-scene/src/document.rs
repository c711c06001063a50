//! Serde schema of a model's `scene.json`.
//!
//! These are the raw records as stored next to the sector files. They are
//! converted to [`crate::SectorMetadata`] by the parser.

use serde::{Deserialize, Serialize};

/// Top-level scene document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    /// Format version (8 or 9).
    pub version: u32,
    /// Highest tree index used by any node in the model.
    #[serde(default)]
    pub max_tree_index: u32,
    /// Length unit of the model coordinates.
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Flat list of sectors in arbitrary order.
    pub sectors: Vec<SectorRecord>,
}

fn default_unit() -> String {
    "Meters".to_string()
}

/// One sector as stored in `scene.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorRecord {
    pub id: u32,
    /// `-1` (or missing) marks the root.
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub depth: u32,
    pub bounding_box: BoxRecord,
    pub index_file: IndexFileRecord,
    #[serde(default)]
    pub faces_file: Option<FacesFileRecord>,
    #[serde(default)]
    pub estimated_draw_call_count: u32,
    #[serde(default)]
    pub estimated_rendering_cost: f32,
}

impl SectorRecord {
    /// Declared parent id, `None` for the root marker.
    pub fn declared_parent(&self) -> Option<u32> {
        match self.parent_id {
            None => None,
            Some(id) if id < 0 => None,
            Some(id) => u32::try_from(id).ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoxRecord {
    pub min: PointRecord,
    pub max: PointRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFileRecord {
    pub file_name: String,
    #[serde(default)]
    pub peripheral_files: Vec<String>,
    #[serde(default)]
    pub download_size: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoverageRecord {
    pub xy: f32,
    pub yz: f32,
    pub xz: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacesFileRecord {
    #[serde(default)]
    pub quad_size: f32,
    pub coverage_factors: CoverageRecord,
    pub recursive_coverage_factors: CoverageRecord,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub download_size: u64,
}

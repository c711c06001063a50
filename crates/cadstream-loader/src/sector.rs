//! Requests and results of sector loads.

use std::rc::Rc;

use cadstream_core::{BoundingBox, ModelIdentifier};
use cadstream_parser::{CollectionType, GeometryCollection};
use cadstream_scene::SectorMetadata;
use serde::{Deserialize, Serialize};

use crate::group::SectorMeshGroup;

/// How much of a sector to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LevelOfDetail {
    /// Nothing; the sector is not shown.
    Discarded,
    /// The faces file, if the sector has one.
    Simple,
    /// The full index file.
    Detailed,
}

/// A sector the scheduler wants on screen.
#[derive(Debug, Clone)]
pub struct WantedSector {
    pub model: ModelIdentifier,
    pub model_base_url: String,
    pub level_of_detail: LevelOfDetail,
    pub metadata: SectorMetadata,
    /// Geometry entirely outside this box is dropped after parsing.
    pub geometry_clip_box: Option<BoundingBox>,
}

impl WantedSector {
    /// Request for `metadata` at `level_of_detail`, without a clip box.
    pub fn new(
        model: ModelIdentifier,
        model_base_url: impl Into<String>,
        level_of_detail: LevelOfDetail,
        metadata: SectorMetadata,
    ) -> Self {
        Self {
            model,
            model_base_url: model_base_url.into(),
            level_of_detail,
            metadata,
            geometry_clip_box: None,
        }
    }

    /// Drop geometry outside `clip_box` once loaded.
    pub fn with_clip_box(mut self, clip_box: Option<BoundingBox>) -> Self {
        self.geometry_clip_box = clip_box;
        self
    }

    /// Id of the requested sector.
    pub fn sector_id(&self) -> u32 {
        self.metadata.id
    }

    /// File holding the requested level of detail.
    ///
    /// `None` when there is nothing to fetch.
    pub fn file_name(&self) -> Option<&str> {
        match self.level_of_detail {
            LevelOfDetail::Discarded => None,
            LevelOfDetail::Simple => self.metadata.faces_file.file_name.as_deref(),
            LevelOfDetail::Detailed => Some(&self.metadata.index_file.file_name),
        }
    }
}

/// A primitive collection waiting for the geometry batcher.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGeometry {
    pub kind: CollectionType,
    pub sector_id: u32,
    pub collection: Rc<GeometryCollection>,
}

/// Outcome of a sector load.
///
/// Clones share the mesh group, so the group is released only after the
/// last clone is dropped.
#[derive(Debug, Clone)]
pub struct ConsumedSector {
    pub model: ModelIdentifier,
    pub metadata: SectorMetadata,
    pub level_of_detail: LevelOfDetail,
    /// Renderable meshes, `None` when the sector produced none.
    pub group: Option<Rc<SectorMeshGroup>>,
    pub batched: Vec<ParsedGeometry>,
}

impl ConsumedSector {
    /// An empty result at the given level of detail.
    pub fn empty(wanted: &WantedSector, level_of_detail: LevelOfDetail) -> Self {
        Self {
            model: wanted.model.clone(),
            metadata: wanted.metadata.clone(),
            level_of_detail,
            group: None,
            batched: Vec::new(),
        }
    }

    /// Placeholder for a sector that could not be loaded.
    pub fn discarded(wanted: &WantedSector) -> Self {
        Self::empty(wanted, LevelOfDetail::Discarded)
    }

    /// Id of the loaded sector.
    pub fn sector_id(&self) -> u32 {
        self.metadata.id
    }

    /// Whether nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.batched.is_empty() && self.group.as_ref().map_or(true, |g| g.is_empty())
    }

    /// Bytes of decoded geometry held by this result.
    pub fn byte_size(&self) -> u64 {
        let batched: usize = self.batched.iter().map(|g| g.collection.byte_size()).sum();
        let meshes = self.group.as_ref().map_or(0, |g| g.byte_size());
        (batched + meshes) as u64
    }
}

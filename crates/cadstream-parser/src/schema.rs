//! JSON chunk schema of a sector file.

use serde::{Deserialize, Serialize};

use crate::collection::CollectionType;

/// Root object of the JSON chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorJson {
    /// Byte ranges into the binary chunk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferView>,
    /// Geometry collections in file order.
    #[serde(default)]
    pub collections: Vec<CollectionJson>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
}

/// One tagged geometry collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionJson {
    #[serde(rename = "type")]
    pub kind: CollectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<InstancesJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<MeshJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<TextureJson>,
}

/// Interleaved per-instance records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancesJson {
    pub buffer_view: usize,
    pub byte_stride: usize,
    pub attributes: Vec<AttributeJson>,
}

/// A named run of `f32` components inside each instance record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeJson {
    pub name: String,
    pub byte_offset: usize,
    pub components: usize,
}

/// Buffer view indices of a triangle mesh.
///
/// Positions and uvs are `f32`, indices and tree indices `u32`, colors
/// RGBA `u8`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshJson {
    pub positions: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<usize>,
    pub tree_indices: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvs: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureJson {
    pub buffer_view: usize,
    pub mime_type: String,
}

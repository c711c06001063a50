//! Typed geometry collections.

use std::fmt;

use cadstream_core::BoundingBox;
use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, Result};

/// Name of the per-instance transform attribute.
pub const INSTANCE_MATRIX: &str = "a_instanceMatrix";
/// Name of the per-instance tree index attribute.
pub const TREE_INDEX: &str = "a_treeIndex";

/// Kind of geometry stored in a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionType {
    BoxCollection,
    CircleCollection,
    ConeCollection,
    EccentricConeCollection,
    EllipsoidSegmentCollection,
    GeneralCylinderCollection,
    GeneralRingCollection,
    QuadCollection,
    TorusSegmentCollection,
    TrapeziumCollection,
    NutCollection,
    InstanceMesh,
    TriangleMesh,
    TexturedTriangleMesh,
}

impl CollectionType {
    /// Every collection kind.
    pub const ALL: [CollectionType; 14] = [
        CollectionType::BoxCollection,
        CollectionType::CircleCollection,
        CollectionType::ConeCollection,
        CollectionType::EccentricConeCollection,
        CollectionType::EllipsoidSegmentCollection,
        CollectionType::GeneralCylinderCollection,
        CollectionType::GeneralRingCollection,
        CollectionType::QuadCollection,
        CollectionType::TorusSegmentCollection,
        CollectionType::TrapeziumCollection,
        CollectionType::NutCollection,
        CollectionType::InstanceMesh,
        CollectionType::TriangleMesh,
        CollectionType::TexturedTriangleMesh,
    ];

    /// Name used in sector files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BoxCollection => "BoxCollection",
            Self::CircleCollection => "CircleCollection",
            Self::ConeCollection => "ConeCollection",
            Self::EccentricConeCollection => "EccentricConeCollection",
            Self::EllipsoidSegmentCollection => "EllipsoidSegmentCollection",
            Self::GeneralCylinderCollection => "GeneralCylinderCollection",
            Self::GeneralRingCollection => "GeneralRingCollection",
            Self::QuadCollection => "QuadCollection",
            Self::TorusSegmentCollection => "TorusSegmentCollection",
            Self::TrapeziumCollection => "TrapeziumCollection",
            Self::NutCollection => "NutCollection",
            Self::InstanceMesh => "InstanceMesh",
            Self::TriangleMesh => "TriangleMesh",
            Self::TexturedTriangleMesh => "TexturedTriangleMesh",
        }
    }

    /// Primitive collections are drawn from per-instance records only.
    pub fn is_primitive(&self) -> bool {
        match self {
            Self::BoxCollection
            | Self::CircleCollection
            | Self::ConeCollection
            | Self::EccentricConeCollection
            | Self::EllipsoidSegmentCollection
            | Self::GeneralCylinderCollection
            | Self::GeneralRingCollection
            | Self::QuadCollection
            | Self::TorusSegmentCollection
            | Self::TrapeziumCollection
            | Self::NutCollection => true,
            Self::InstanceMesh | Self::TriangleMesh | Self::TexturedTriangleMesh => false,
        }
    }

    /// Whether collections of this kind go to the batching queue instead of
    /// becoming meshes of their own.
    pub fn is_batched(&self) -> bool {
        match self {
            Self::BoxCollection
            | Self::CircleCollection
            | Self::ConeCollection
            | Self::EccentricConeCollection
            | Self::EllipsoidSegmentCollection
            | Self::GeneralCylinderCollection
            | Self::GeneralRingCollection
            | Self::QuadCollection
            | Self::TorusSegmentCollection
            | Self::TrapeziumCollection
            | Self::NutCollection
            | Self::InstanceMesh => true,
            Self::TriangleMesh | Self::TexturedTriangleMesh => false,
        }
    }

    /// Instance attributes needed to compute per-instance bounds, with their
    /// component counts.
    pub fn required_attributes(&self) -> &'static [(&'static str, usize)] {
        match self {
            Self::BoxCollection
            | Self::CircleCollection
            | Self::GeneralRingCollection
            | Self::QuadCollection
            | Self::NutCollection
            | Self::InstanceMesh => &[(INSTANCE_MATRIX, 16)],
            Self::ConeCollection | Self::EccentricConeCollection => &[
                ("a_centerA", 3),
                ("a_centerB", 3),
                ("a_radiusA", 1),
                ("a_radiusB", 1),
            ],
            Self::GeneralCylinderCollection => {
                &[("a_centerA", 3), ("a_centerB", 3), ("a_radius", 1)]
            }
            Self::EllipsoidSegmentCollection => &[
                ("a_center", 3),
                ("a_horizontalRadius", 1),
                ("a_verticalRadius", 1),
                ("a_height", 1),
            ],
            Self::TorusSegmentCollection => {
                &[(INSTANCE_MATRIX, 16), ("a_radius", 1), ("a_tubeRadius", 1)]
            }
            Self::TrapeziumCollection => &[
                ("a_vertex1", 3),
                ("a_vertex2", 3),
                ("a_vertex3", 3),
                ("a_vertex4", 3),
            ],
            Self::TriangleMesh | Self::TexturedTriangleMesh => &[],
        }
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Placement of one attribute inside an instance record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeLayout {
    pub name: String,
    pub byte_offset: usize,
    /// Number of `f32` components.
    pub components: usize,
}

impl AttributeLayout {
    /// Attribute `name` at `byte_offset` with `components` floats.
    pub fn new(name: impl Into<String>, byte_offset: usize, components: usize) -> Self {
        Self {
            name: name.into(),
            byte_offset,
            components,
        }
    }

    /// First byte past the attribute, `None` if it does not fit in `usize`.
    fn byte_end(&self) -> Option<usize> {
        self.components
            .checked_mul(4)
            .and_then(|len| len.checked_add(self.byte_offset))
    }
}

/// Interleaved per-instance records of fixed stride.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceBuffer {
    stride: usize,
    attributes: Vec<AttributeLayout>,
    data: Vec<u8>,
}

impl InstanceBuffer {
    /// Validate the layout against the data.
    pub fn new(stride: usize, attributes: Vec<AttributeLayout>, data: Vec<u8>) -> Result<Self> {
        if stride == 0 {
            return Err(ParseError::parse("instance stride is zero"));
        }
        if data.len() % stride != 0 {
            return Err(ParseError::parse(format!(
                "instance data of {} bytes is not a multiple of stride {stride}",
                data.len()
            )));
        }
        for attribute in &attributes {
            match attribute.byte_end() {
                Some(end) if end <= stride => {}
                Some(end) => {
                    return Err(ParseError::parse(format!(
                        "attribute {} ends at byte {end} past stride {stride}",
                        attribute.name
                    )))
                }
                None => {
                    return Err(ParseError::parse(format!(
                        "attribute {} with {} components at offset {} overflows",
                        attribute.name, attribute.components, attribute.byte_offset
                    )))
                }
            }
        }
        Ok(Self {
            stride,
            attributes,
            data,
        })
    }

    /// Build a buffer from `f32` records laid out as `attributes` in order.
    pub fn from_records(
        attributes: &[(&str, usize)],
        records: impl IntoIterator<Item = Vec<f32>>,
    ) -> Result<Self> {
        let mut layout = Vec::with_capacity(attributes.len());
        let mut offset = 0;
        for &(name, components) in attributes {
            layout.push(AttributeLayout::new(name, offset, components));
            offset += components * 4;
        }
        let mut data = Vec::new();
        for record in records {
            if record.len() * 4 != offset {
                return Err(ParseError::parse(format!(
                    "record has {} floats, layout needs {}",
                    record.len(),
                    offset / 4
                )));
            }
            data.extend(record.iter().flat_map(|v| v.to_le_bytes()));
        }
        Self::new(offset, layout, data)
    }

    /// Bytes per instance record.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn attributes(&self) -> &[AttributeLayout] {
        &self.attributes
    }

    /// Raw little-endian records.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of instance records.
    pub fn count(&self) -> usize {
        self.data.len() / self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Layout of attribute `name`.
    pub fn attribute(&self, name: &str) -> Option<&AttributeLayout> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Component `component` of attribute `name` for instance `index`.
    pub fn scalar(&self, index: usize, name: &str, component: usize) -> Option<f32> {
        let attribute = self.attribute(name)?;
        if component >= attribute.components || index >= self.count() {
            return None;
        }
        let start = index
            .checked_mul(self.stride)?
            .checked_add(attribute.byte_offset)?
            .checked_add(component.checked_mul(4)?)?;
        let bytes = self.data.get(start..start.checked_add(4)?)?;
        Some(f32::from_le_bytes(bytes.try_into().ok()?))
    }

    /// Three-component attribute `name` of instance `index`.
    pub fn vec3(&self, index: usize, name: &str) -> Option<Vec3> {
        Some(Vec3::new(
            self.scalar(index, name, 0)?,
            self.scalar(index, name, 1)?,
            self.scalar(index, name, 2)?,
        ))
    }

    /// Column-major 4x4 matrix attribute.
    pub fn mat4(&self, index: usize, name: &str) -> Option<Mat4> {
        let mut cols = [0.0f32; 16];
        for (i, value) in cols.iter_mut().enumerate() {
            *value = self.scalar(index, name, i)?;
        }
        Some(Mat4::from_cols_array(&cols))
    }

    /// Copy of this buffer keeping only instances accepted by `keep`.
    pub fn retain(&self, mut keep: impl FnMut(usize) -> bool) -> InstanceBuffer {
        let data = self
            .data
            .chunks_exact(self.stride)
            .enumerate()
            .filter(|(index, _)| keep(*index))
            .flat_map(|(_, record)| record.iter().copied())
            .collect();
        InstanceBuffer {
            stride: self.stride,
            attributes: self.attributes.clone(),
            data,
        }
    }
}

/// Vertex buffers of a triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffers {
    pub positions: Vec<Vec3>,
    /// Empty for non-indexed meshes.
    pub indices: Vec<u32>,
    /// Tree index of the node each vertex belongs to.
    pub tree_indices: Vec<u32>,
    pub colors: Vec<[u8; 4]>,
    pub uvs: Vec<Vec2>,
}

impl MeshBuffers {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }

    /// Number of triangles, indexed or not.
    pub fn triangle_count(&self) -> usize {
        if self.is_indexed() {
            self.indices.len() / 3
        } else {
            self.positions.len() / 3
        }
    }

    /// Bounds of the vertex positions, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.positions.iter().copied())
    }

    /// Approximate memory held by the buffers.
    pub fn byte_size(&self) -> usize {
        self.positions.len() * 12
            + self.indices.len() * 4
            + self.tree_indices.len() * 4
            + self.colors.len() * 4
            + self.uvs.len() * 8
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let vertices = self.positions.len();
        if self.tree_indices.len() != vertices {
            return Err(ParseError::parse(format!(
                "{} tree indices for {vertices} vertices",
                self.tree_indices.len()
            )));
        }
        if !self.colors.is_empty() && self.colors.len() != vertices {
            return Err(ParseError::parse(format!(
                "{} colors for {vertices} vertices",
                self.colors.len()
            )));
        }
        if !self.uvs.is_empty() && self.uvs.len() != vertices {
            return Err(ParseError::parse(format!(
                "{} uvs for {vertices} vertices",
                self.uvs.len()
            )));
        }
        if let Some(index) = self.indices.iter().find(|&&i| i as usize >= vertices) {
            return Err(ParseError::parse(format!(
                "index {index} out of range for {vertices} vertices"
            )));
        }
        Ok(())
    }
}

/// Texture embedded in a textured mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Geometry payload of a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// One record per primitive instance.
    Instances(InstanceBuffer),
    /// Plain triangles.
    Mesh(MeshBuffers),
    /// A shared mesh drawn once per instance transform.
    InstancedMesh {
        mesh: MeshBuffers,
        instances: InstanceBuffer,
    },
}

/// One decoded collection of a sector.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryCollection {
    pub kind: CollectionType,
    pub geometry: Geometry,
    /// Identifier of the shared mesh of an instance mesh.
    pub instance_id: Option<u64>,
    pub texture: Option<Texture>,
}

impl GeometryCollection {
    /// Collection of primitive instances.
    pub fn primitives(kind: CollectionType, instances: InstanceBuffer) -> Self {
        Self {
            kind,
            geometry: Geometry::Instances(instances),
            instance_id: None,
            texture: None,
        }
    }

    /// Plain triangle mesh.
    pub fn triangle_mesh(mesh: MeshBuffers) -> Self {
        Self {
            kind: CollectionType::TriangleMesh,
            geometry: Geometry::Mesh(mesh),
            instance_id: None,
            texture: None,
        }
    }

    /// Triangle mesh with an embedded texture.
    pub fn textured_mesh(mesh: MeshBuffers, texture: Texture) -> Self {
        Self {
            kind: CollectionType::TexturedTriangleMesh,
            geometry: Geometry::Mesh(mesh),
            instance_id: None,
            texture: Some(texture),
        }
    }

    /// Shared mesh `instance_id` drawn once per record in `instances`.
    pub fn instance_mesh(instance_id: u64, mesh: MeshBuffers, instances: InstanceBuffer) -> Self {
        Self {
            kind: CollectionType::InstanceMesh,
            geometry: Geometry::InstancedMesh { mesh, instances },
            instance_id: Some(instance_id),
            texture: None,
        }
    }

    /// Number of drawn instances; a plain mesh counts as one.
    pub fn instance_count(&self) -> usize {
        match &self.geometry {
            Geometry::Instances(instances) | Geometry::InstancedMesh { instances, .. } => {
                instances.count()
            }
            Geometry::Mesh(_) => 1,
        }
    }

    /// Bounds of mesh geometry, with instance transforms applied.
    ///
    /// `None` for primitive collections, whose bounds depend on the kind.
    pub fn mesh_bounds(&self) -> Option<BoundingBox> {
        match &self.geometry {
            Geometry::Instances(_) => None,
            Geometry::Mesh(mesh) => mesh.bounds(),
            Geometry::InstancedMesh { mesh, instances } => {
                let local = mesh.bounds()?;
                (0..instances.count())
                    .filter_map(|i| instances.mat4(i, INSTANCE_MATRIX))
                    .map(|matrix| local.transformed(&matrix))
                    .reduce(|a, b| a.union(&b))
            }
        }
    }

    /// Approximate memory held by this collection.
    pub fn byte_size(&self) -> usize {
        let geometry = match &self.geometry {
            Geometry::Instances(instances) => instances.data().len(),
            Geometry::Mesh(mesh) => mesh.byte_size(),
            Geometry::InstancedMesh { mesh, instances } => {
                mesh.byte_size() + instances.data().len()
            }
        };
        geometry + self.texture.as_ref().map_or(0, |t| t.data.len())
    }
}

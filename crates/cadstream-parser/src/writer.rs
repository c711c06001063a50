//! Sector file writer.
//!
//! Produces the container read by [`crate::parse_sector`]. Used to author
//! sector fixtures and to re-encode filtered sectors.

use crate::collection::{Geometry, GeometryCollection, InstanceBuffer, MeshBuffers};
use crate::container::write_container;
use crate::error::Result;
use crate::schema::{AttributeJson, BufferView, CollectionJson, InstancesJson, MeshJson, SectorJson, TextureJson};

/// Writer for sector files.
#[derive(Debug, Default)]
pub struct SectorWriter {
    bin: Vec<u8>,
    views: Vec<BufferView>,
}

impl SectorWriter {
    /// Create a writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `collections` as one sector file.
    pub fn write(mut self, collections: &[GeometryCollection]) -> Result<Vec<u8>> {
        let collections = collections
            .iter()
            .map(|collection| self.add_collection(collection))
            .collect();
        let document = SectorJson {
            buffer_views: std::mem::take(&mut self.views),
            collections,
        };
        let json = serde_json::to_vec(&document)?;
        Ok(write_container(&json, &self.bin))
    }

    fn add_collection(&mut self, collection: &GeometryCollection) -> CollectionJson {
        let (instances, mesh) = match &collection.geometry {
            Geometry::Instances(instances) => (Some(self.add_instances(instances)), None),
            Geometry::Mesh(mesh) => (None, Some(self.add_mesh(mesh))),
            Geometry::InstancedMesh { mesh, instances } => {
                let mesh = self.add_mesh(mesh);
                (Some(self.add_instances(instances)), Some(mesh))
            }
        };
        let texture = collection.texture.as_ref().map(|texture| TextureJson {
            buffer_view: self.add_view(&texture.data),
            mime_type: texture.mime_type.clone(),
        });
        CollectionJson {
            kind: collection.kind,
            instances,
            mesh,
            instance_id: collection.instance_id,
            texture,
        }
    }

    fn add_instances(&mut self, instances: &InstanceBuffer) -> InstancesJson {
        InstancesJson {
            buffer_view: self.add_view(instances.data()),
            byte_stride: instances.stride(),
            attributes: instances
                .attributes()
                .iter()
                .map(|a| AttributeJson {
                    name: a.name.clone(),
                    byte_offset: a.byte_offset,
                    components: a.components,
                })
                .collect(),
        }
    }

    fn add_mesh(&mut self, mesh: &MeshBuffers) -> MeshJson {
        let positions: Vec<u8> = mesh
            .positions
            .iter()
            .flat_map(|p| p.to_array())
            .flat_map(f32::to_le_bytes)
            .collect();
        let tree_indices: Vec<u8> = mesh.tree_indices.iter().flat_map(|i| i.to_le_bytes()).collect();

        let positions = self.add_view(&positions);
        let tree_indices = self.add_view(&tree_indices);
        let indices = (!mesh.indices.is_empty()).then(|| {
            let bytes: Vec<u8> = mesh.indices.iter().flat_map(|i| i.to_le_bytes()).collect();
            self.add_view(&bytes)
        });
        let colors = (!mesh.colors.is_empty()).then(|| {
            let bytes: Vec<u8> = mesh.colors.iter().flatten().copied().collect();
            self.add_view(&bytes)
        });
        let uvs = (!mesh.uvs.is_empty()).then(|| {
            let bytes: Vec<u8> = mesh
                .uvs
                .iter()
                .flat_map(|uv| uv.to_array())
                .flat_map(f32::to_le_bytes)
                .collect();
            self.add_view(&bytes)
        });

        MeshJson {
            positions,
            indices,
            tree_indices,
            colors,
            uvs,
        }
    }

    fn add_view(&mut self, data: &[u8]) -> usize {
        // Views start on 4-byte boundaries
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        self.views.push(BufferView {
            byte_offset: self.bin.len(),
            byte_length: data.len(),
        });
        self.bin.extend_from_slice(data);
        self.views.len() - 1
    }
}

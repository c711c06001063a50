//! Sector file reader.

use glam::{Vec2, Vec3};

use crate::collection::{
    AttributeLayout, CollectionType, Geometry, GeometryCollection, InstanceBuffer, MeshBuffers,
    Texture,
};
use crate::container::read_container;
use crate::error::{ParseError, Result};
use crate::schema::{BufferView, CollectionJson, InstancesJson, MeshJson, SectorJson};

/// Decode all geometry collections of a sector file.
pub fn parse_sector(data: &[u8]) -> Result<Vec<GeometryCollection>> {
    let container = read_container(data)?;
    let document: SectorJson = serde_json::from_slice(container.json)?;
    let views = Views {
        views: &document.buffer_views,
        bin: container.bin,
    };

    document
        .collections
        .iter()
        .enumerate()
        .map(|(index, collection)| {
            read_collection(collection, &views).map_err(|err| match err {
                ParseError::ParseError {
                    message,
                    context: None,
                } => ParseError::parse_context(
                    message,
                    format!("collection {index} ({})", collection.kind),
                ),
                other => other,
            })
        })
        .collect()
}

struct Views<'a> {
    views: &'a [BufferView],
    bin: &'a [u8],
}

impl<'a> Views<'a> {
    fn bytes(&self, index: usize) -> Result<&'a [u8]> {
        let view = self
            .views
            .get(index)
            .ok_or_else(|| ParseError::parse(format!("buffer view {index} does not exist")))?;
        let end = view.byte_offset.checked_add(view.byte_length);
        end.and_then(|end| self.bin.get(view.byte_offset..end))
            .ok_or_else(|| {
                ParseError::parse(format!(
                    "buffer view {index} ({}+{}) exceeds the {} byte binary chunk",
                    view.byte_offset,
                    view.byte_length,
                    self.bin.len()
                ))
            })
    }

    fn f32s(&self, index: usize) -> Result<Vec<f32>> {
        let bytes = self.aligned(index, 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn u32s(&self, index: usize) -> Result<Vec<u32>> {
        let bytes = self.aligned(index, 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn aligned(&self, index: usize, element: usize) -> Result<&'a [u8]> {
        let bytes = self.bytes(index)?;
        if bytes.len() % element != 0 {
            return Err(ParseError::parse(format!(
                "buffer view {index} length {} is not a multiple of {element}",
                bytes.len()
            )));
        }
        Ok(bytes)
    }
}

fn read_collection(collection: &CollectionJson, views: &Views<'_>) -> Result<GeometryCollection> {
    let kind = collection.kind;
    match kind {
        CollectionType::BoxCollection
        | CollectionType::CircleCollection
        | CollectionType::ConeCollection
        | CollectionType::EccentricConeCollection
        | CollectionType::EllipsoidSegmentCollection
        | CollectionType::GeneralCylinderCollection
        | CollectionType::GeneralRingCollection
        | CollectionType::QuadCollection
        | CollectionType::TorusSegmentCollection
        | CollectionType::TrapeziumCollection
        | CollectionType::NutCollection => {
            let instances = read_instances(kind, collection.instances.as_ref(), views)?;
            Ok(GeometryCollection::primitives(kind, instances))
        }
        CollectionType::InstanceMesh => {
            let instance_id = collection
                .instance_id
                .ok_or_else(|| ParseError::parse("instance mesh has no instanceId"))?;
            let mesh = read_mesh(required(collection.mesh.as_ref(), "mesh")?, views)?;
            let instances = read_instances(kind, collection.instances.as_ref(), views)?;
            Ok(GeometryCollection::instance_mesh(instance_id, mesh, instances))
        }
        CollectionType::TriangleMesh => {
            let mesh = read_mesh(required(collection.mesh.as_ref(), "mesh")?, views)?;
            Ok(GeometryCollection::triangle_mesh(mesh))
        }
        CollectionType::TexturedTriangleMesh => {
            let mesh = read_mesh(required(collection.mesh.as_ref(), "mesh")?, views)?;
            if mesh.uvs.is_empty() && mesh.vertex_count() > 0 {
                return Err(ParseError::parse("textured mesh has no uvs"));
            }
            let texture = required(collection.texture.as_ref(), "texture")?;
            let texture = Texture {
                mime_type: texture.mime_type.clone(),
                data: views.bytes(texture.buffer_view)?.to_vec(),
            };
            Ok(GeometryCollection::textured_mesh(mesh, texture))
        }
    }
}

fn required<'a, T>(value: Option<&'a T>, what: &str) -> Result<&'a T> {
    value.ok_or_else(|| ParseError::parse(format!("missing {what}")))
}

fn read_instances(
    kind: CollectionType,
    json: Option<&InstancesJson>,
    views: &Views<'_>,
) -> Result<InstanceBuffer> {
    let json = required(json, "instances")?;
    let attributes: Vec<AttributeLayout> = json
        .attributes
        .iter()
        .map(|a| AttributeLayout::new(a.name.clone(), a.byte_offset, a.components))
        .collect();

    for &(name, components) in kind.required_attributes() {
        match attributes.iter().find(|a| a.name == name) {
            Some(a) if a.components >= components => {}
            Some(a) => {
                return Err(ParseError::parse(format!(
                    "attribute {name} has {} components, {components} needed",
                    a.components
                )))
            }
            None => return Err(ParseError::parse(format!("missing attribute {name}"))),
        }
    }

    let data = views.bytes(json.buffer_view)?.to_vec();
    InstanceBuffer::new(json.byte_stride, attributes, data)
}

fn read_mesh(json: &MeshJson, views: &Views<'_>) -> Result<MeshBuffers> {
    let positions = views.f32s(json.positions)?;
    if positions.len() % 3 != 0 {
        return Err(ParseError::parse("position count is not a multiple of 3"));
    }
    let positions: Vec<Vec3> = positions
        .chunks_exact(3)
        .map(Vec3::from_slice)
        .collect();

    let indices = match json.indices {
        Some(view) => views.u32s(view)?,
        None => Vec::new(),
    };
    let tree_indices = views.u32s(json.tree_indices)?;
    let colors = match json.colors {
        Some(view) => views
            .aligned(view, 4)?
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect(),
        None => Vec::new(),
    };
    let uvs = match json.uvs {
        Some(view) => {
            let values = views.f32s(view)?;
            if values.len() % 2 != 0 {
                return Err(ParseError::parse("uv count is not a multiple of 2"));
            }
            values.chunks_exact(2).map(Vec2::from_slice).collect()
        }
        None => Vec::new(),
    };

    let mesh = MeshBuffers {
        positions,
        indices,
        tree_indices,
        colors,
        uvs,
    };
    mesh.validate()?;
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{INSTANCE_MATRIX, TREE_INDEX};
    use crate::container::write_container;
    use crate::writer::SectorWriter;
    use glam::Mat4;

    fn boxes() -> GeometryCollection {
        let records = (0..3).map(|i| {
            let mut record = Mat4::from_translation(Vec3::splat(i as f32)).to_cols_array().to_vec();
            record.push(i as f32);
            record
        });
        let instances =
            InstanceBuffer::from_records(&[(INSTANCE_MATRIX, 16), (TREE_INDEX, 1)], records).unwrap();
        GeometryCollection::primitives(CollectionType::BoxCollection, instances)
    }

    fn triangle() -> MeshBuffers {
        MeshBuffers {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            indices: vec![0, 1, 2],
            tree_indices: vec![4, 4, 5],
            colors: vec![[255, 0, 0, 255]; 3],
            uvs: Vec::new(),
        }
    }

    #[test]
    fn test_parse_written_sector() {
        let mut textured = triangle();
        textured.uvs = vec![Vec2::ZERO, Vec2::X, Vec2::Y];
        let collections = vec![
            boxes(),
            GeometryCollection::triangle_mesh(triangle()),
            GeometryCollection::textured_mesh(
                textured,
                Texture {
                    mime_type: "image/png".into(),
                    data: vec![0x89, b'P', b'N', b'G', 1],
                },
            ),
        ];
        let bytes = SectorWriter::new().write(&collections).unwrap();
        let parsed = parse_sector(&bytes).unwrap();
        assert_eq!(parsed, collections);
    }

    #[test]
    fn test_empty_sector() {
        let bytes = SectorWriter::new().write(&[]).unwrap();
        assert!(parse_sector(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_is_invalid_model() {
        let err = parse_sector(b"0123456789abcdef").unwrap_err();
        assert!(err.is_invalid_model());
    }

    #[test]
    fn test_bad_json_is_generic_error() {
        let bytes = write_container(b"{not json", &[]);
        let err = parse_sector(&bytes).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
        assert!(!err.is_invalid_model());
    }

    #[test]
    fn test_unknown_collection_type() {
        let json = br#"{"collections":[{"type":"SphereCollection"}]}"#;
        let err = parse_sector(&write_container(json, &[])).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn test_view_out_of_range() {
        let json = br#"{
            "bufferViews": [{"byteOffset": 0, "byteLength": 64}],
            "collections": [{"type": "NutCollection", "instances": {
                "bufferView": 0, "byteStride": 64,
                "attributes": [{"name": "a_instanceMatrix", "byteOffset": 0, "components": 16}]
            }}]
        }"#;
        let err = parse_sector(&write_container(json, &[0; 32])).unwrap_err();
        match err {
            ParseError::ParseError { message, context } => {
                assert!(message.contains("exceeds"));
                assert_eq!(context.as_deref(), Some("collection 0 (NutCollection)"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_oversized_attribute_is_parse_error() {
        let json = br#"{
            "bufferViews": [{"byteOffset": 0, "byteLength": 64}],
            "collections": [{"type": "BoxCollection", "instances": {
                "bufferView": 0, "byteStride": 64,
                "attributes": [{"name": "a_instanceMatrix", "byteOffset": 0, "components": 4611686018427387904}]
            }}]
        }"#;
        let err = parse_sector(&write_container(json, &[0; 64])).unwrap_err();
        match err {
            ParseError::ParseError { message, context } => {
                assert!(message.contains("overflows"));
                assert_eq!(context.as_deref(), Some("collection 0 (BoxCollection)"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_missing_required_attribute() {
        let json = br#"{
            "bufferViews": [{"byteOffset": 0, "byteLength": 16}],
            "collections": [{"type": "GeneralCylinderCollection", "instances": {
                "bufferView": 0, "byteStride": 16,
                "attributes": [{"name": "a_centerA", "byteOffset": 0, "components": 3}]
            }}]
        }"#;
        let err = parse_sector(&write_container(json, &[0; 16])).unwrap_err();
        assert!(matches!(err, ParseError::ParseError { ref message, .. } if message.contains("a_centerB")));
    }

    #[test]
    fn test_instance_mesh_requires_id() {
        let json = br#"{
            "bufferViews": [{"byteOffset": 0, "byteLength": 12}],
            "collections": [{"type": "InstanceMesh", "mesh": {"positions": 0, "treeIndices": 0}}]
        }"#;
        let err = parse_sector(&write_container(json, &[0; 12])).unwrap_err();
        assert!(matches!(err, ParseError::ParseError { ref message, .. } if message.contains("instanceId")));
    }
}

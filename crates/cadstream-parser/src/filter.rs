//! Clip-box filtering of geometry collections.
//!
//! Primitive collections are filtered instance by instance from bounds
//! derived from their attributes. Mesh collections are kept or dropped whole.

use cadstream_core::BoundingBox;
use glam::{Mat4, Vec3};

use crate::collection::{CollectionType, Geometry, GeometryCollection, InstanceBuffer, INSTANCE_MATRIX};

const EPSILON: f32 = 1e-4;

/// Untransformed bounds of box and nut primitives.
const UNIT_BOX: BoundingBox = BoundingBox {
    min: Vec3::splat(-0.5),
    max: Vec3::splat(0.5),
};

/// Untransformed bounds of flat primitives (circles, rings, quads).
const QUAD_BOX: BoundingBox = BoundingBox {
    min: Vec3::new(-0.5, -0.5, -EPSILON),
    max: Vec3::new(0.5, 0.5, EPSILON),
};

/// Drop the parts of `collection` that lie outside `clip_box`.
///
/// Returns `None` when nothing is left.
pub fn filter_outside_clip_box(
    collection: GeometryCollection,
    clip_box: &BoundingBox,
) -> Option<GeometryCollection> {
    let kind = collection.kind;
    let filtered = match &collection.geometry {
        Geometry::Instances(instances) => Some(instances.retain(|index| {
            // Instances with unreadable bounds are kept
            primitive_bounds(kind, instances, index).map_or(true, |b| b.intersects(clip_box))
        })),
        Geometry::Mesh(_) | Geometry::InstancedMesh { .. } => None,
    };

    match filtered {
        Some(kept) if kept.is_empty() => None,
        Some(kept) => Some(GeometryCollection {
            geometry: Geometry::Instances(kept),
            ..collection
        }),
        None => {
            let inside = collection
                .mesh_bounds()
                .map_or(true, |bounds| bounds.intersects(clip_box));
            inside.then_some(collection)
        }
    }
}

/// World bounds of primitive instance `index`.
///
/// `None` for mesh kinds and for instances whose attributes cannot be read.
pub fn primitive_bounds(
    kind: CollectionType,
    instances: &InstanceBuffer,
    index: usize,
) -> Option<BoundingBox> {
    match kind {
        CollectionType::BoxCollection | CollectionType::NutCollection => {
            matrix_bounds(instances, index, &UNIT_BOX)
        }
        CollectionType::CircleCollection
        | CollectionType::GeneralRingCollection
        | CollectionType::QuadCollection => matrix_bounds(instances, index, &QUAD_BOX),
        CollectionType::ConeCollection | CollectionType::EccentricConeCollection => {
            capsule_bounds(instances, index, "a_radiusA", "a_radiusB")
        }
        CollectionType::GeneralCylinderCollection => {
            capsule_bounds(instances, index, "a_radius", "a_radius")
        }
        CollectionType::EllipsoidSegmentCollection => ellipsoid_bounds(instances, index),
        CollectionType::TorusSegmentCollection => torus_bounds(instances, index),
        CollectionType::TrapeziumCollection => trapezium_bounds(instances, index),
        CollectionType::InstanceMesh
        | CollectionType::TriangleMesh
        | CollectionType::TexturedTriangleMesh => None,
    }
}

fn instance_matrix(instances: &InstanceBuffer, index: usize) -> Option<Mat4> {
    instances.mat4(index, INSTANCE_MATRIX)
}

fn matrix_bounds(instances: &InstanceBuffer, index: usize, local: &BoundingBox) -> Option<BoundingBox> {
    Some(local.transformed(&instance_matrix(instances, index)?))
}

/// Union of the boxes around both end caps.
fn capsule_bounds(
    instances: &InstanceBuffer,
    index: usize,
    radius_a: &str,
    radius_b: &str,
) -> Option<BoundingBox> {
    let a = BoundingBox::from_center_radius(
        instances.vec3(index, "a_centerA")?,
        instances.scalar(index, radius_a, 0)?,
    );
    let b = BoundingBox::from_center_radius(
        instances.vec3(index, "a_centerB")?,
        instances.scalar(index, radius_b, 0)?,
    );
    Some(a.union(&b))
}

fn ellipsoid_bounds(instances: &InstanceBuffer, index: usize) -> Option<BoundingBox> {
    let center = instances.vec3(index, "a_center")?;
    let horizontal = instances.scalar(index, "a_horizontalRadius", 0)?;
    let vertical = instances.scalar(index, "a_verticalRadius", 0)?;
    // The segment never extends past the full ellipsoid
    Some(BoundingBox::from_center_radius(center, horizontal.max(vertical)))
}

fn torus_bounds(instances: &InstanceBuffer, index: usize) -> Option<BoundingBox> {
    let radius = instances.scalar(index, "a_radius", 0)?;
    let tube = instances.scalar(index, "a_tubeRadius", 0)?;
    let extent = radius + tube;
    let local = BoundingBox::new(Vec3::new(-extent, -extent, -tube), Vec3::new(extent, extent, tube));
    matrix_bounds(instances, index, &local)
}

fn trapezium_bounds(instances: &InstanceBuffer, index: usize) -> Option<BoundingBox> {
    let vertices = [
        instances.vec3(index, "a_vertex1")?,
        instances.vec3(index, "a_vertex2")?,
        instances.vec3(index, "a_vertex3")?,
        instances.vec3(index, "a_vertex4")?,
    ];
    BoundingBox::from_points(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{MeshBuffers, TREE_INDEX};
    use proptest::prelude::*;

    fn clip() -> BoundingBox {
        BoundingBox::new(Vec3::ZERO, Vec3::splat(10.0))
    }

    fn translated(kind: CollectionType, positions: &[Vec3]) -> GeometryCollection {
        let records = positions.iter().enumerate().map(|(i, p)| {
            let mut record = Mat4::from_translation(*p).to_cols_array().to_vec();
            record.push(i as f32);
            record
        });
        let instances =
            InstanceBuffer::from_records(&[(INSTANCE_MATRIX, 16), (TREE_INDEX, 1)], records).unwrap();
        GeometryCollection::primitives(kind, instances)
    }

    fn tree_indices(collection: &GeometryCollection) -> Vec<f32> {
        match &collection.geometry {
            Geometry::Instances(instances) => (0..instances.count())
                .filter_map(|i| instances.scalar(i, TREE_INDEX, 0))
                .collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_boxes_outside_are_dropped() {
        let collection = translated(
            CollectionType::BoxCollection,
            &[Vec3::splat(5.0), Vec3::splat(20.0), Vec3::splat(10.4), Vec3::splat(-0.6)],
        );
        let kept = filter_outside_clip_box(collection, &clip()).unwrap();
        // The box at 10.4 reaches back to 9.9
        assert_eq!(tree_indices(&kept), vec![0.0, 2.0]);
    }

    #[test]
    fn test_flat_primitives_use_thin_box() {
        let collection = translated(
            CollectionType::QuadCollection,
            &[Vec3::new(5.0, 5.0, 10.00005), Vec3::new(5.0, 5.0, 10.3)],
        );
        let kept = filter_outside_clip_box(collection, &clip()).unwrap();
        assert_eq!(tree_indices(&kept), vec![0.0]);
    }

    #[test]
    fn test_fully_outside_collection_is_dropped() {
        let collection = translated(CollectionType::NutCollection, &[Vec3::splat(50.0)]);
        assert!(filter_outside_clip_box(collection, &clip()).is_none());
    }

    #[test]
    fn test_cones_use_both_caps() {
        let instances = InstanceBuffer::from_records(
            &[("a_centerA", 3), ("a_centerB", 3), ("a_radiusA", 1), ("a_radiusB", 1)],
            vec![
                // Starts outside, ends inside
                vec![-5.0, 5.0, 5.0, 1.0, 5.0, 5.0, 0.5, 0.5],
                // Entirely outside, but the wide cap reaches in
                vec![-3.0, 5.0, 5.0, -20.0, 5.0, 5.0, 4.0, 0.1],
                // Entirely outside
                vec![-3.0, 5.0, 5.0, -20.0, 5.0, 5.0, 1.0, 1.0],
            ],
        )
        .unwrap();
        let collection = GeometryCollection::primitives(CollectionType::ConeCollection, instances);
        let kept = filter_outside_clip_box(collection, &clip()).unwrap();
        assert_eq!(kept.instance_count(), 2);
    }

    #[test]
    fn test_torus_extent() {
        let instances = InstanceBuffer::from_records(
            &[(INSTANCE_MATRIX, 16), ("a_radius", 1), ("a_tubeRadius", 1)],
            vec![
                [Mat4::from_translation(Vec3::new(-2.5, 5.0, 5.0)).to_cols_array().to_vec(), vec![2.0, 1.0]].concat(),
                [Mat4::from_translation(Vec3::new(-3.5, 5.0, 5.0)).to_cols_array().to_vec(), vec![2.0, 1.0]].concat(),
            ],
        )
        .unwrap();
        let collection = GeometryCollection::primitives(CollectionType::TorusSegmentCollection, instances);
        let kept = filter_outside_clip_box(collection, &clip()).unwrap();
        assert_eq!(kept.instance_count(), 1);
    }

    #[test]
    fn test_trapezium_vertices() {
        let instances = InstanceBuffer::from_records(
            &[("a_vertex1", 3), ("a_vertex2", 3), ("a_vertex3", 3), ("a_vertex4", 3)],
            vec![
                vec![-5.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, -5.0, 2.0, 1.0],
                vec![-5.0, 1.0, 1.0, -4.0, 1.0, 1.0, -4.0, 2.0, 1.0, -5.0, 2.0, 1.0],
            ],
        )
        .unwrap();
        let collection = GeometryCollection::primitives(CollectionType::TrapeziumCollection, instances);
        assert_eq!(filter_outside_clip_box(collection, &clip()).unwrap().instance_count(), 1);
    }

    #[test]
    fn test_ellipsoid_radius() {
        let instances = InstanceBuffer::from_records(
            &[("a_center", 3), ("a_horizontalRadius", 1), ("a_verticalRadius", 1), ("a_height", 1)],
            vec![
                vec![12.0, 5.0, 5.0, 1.0, 3.0, 1.0],
                vec![12.0, 5.0, 5.0, 1.0, 1.5, 1.0],
            ],
        )
        .unwrap();
        let collection =
            GeometryCollection::primitives(CollectionType::EllipsoidSegmentCollection, instances);
        assert_eq!(filter_outside_clip_box(collection, &clip()).unwrap().instance_count(), 1);
    }

    #[test]
    fn test_meshes_are_kept_or_dropped_whole() {
        let mesh = |offset: f32| MeshBuffers {
            positions: vec![Vec3::splat(offset), Vec3::splat(offset + 1.0), Vec3::splat(offset + 30.0)],
            tree_indices: vec![0; 3],
            ..Default::default()
        };
        let straddling = GeometryCollection::triangle_mesh(mesh(9.5));
        let kept = filter_outside_clip_box(straddling.clone(), &clip()).unwrap();
        assert_eq!(kept, straddling);

        let outside = GeometryCollection::triangle_mesh(mesh(11.0));
        assert!(filter_outside_clip_box(outside, &clip()).is_none());
    }

    #[test]
    fn test_instanced_mesh_uses_transformed_bounds() {
        let mesh = MeshBuffers {
            positions: vec![Vec3::ZERO, Vec3::ONE, Vec3::X],
            tree_indices: vec![0; 3],
            ..Default::default()
        };
        let far = InstanceBuffer::from_records(
            &[(INSTANCE_MATRIX, 16)],
            vec![Mat4::from_translation(Vec3::splat(40.0)).to_cols_array().to_vec()],
        )
        .unwrap();
        let collection = GeometryCollection::instance_mesh(1, mesh, far);
        assert!(filter_outside_clip_box(collection, &clip()).is_none());
    }

    proptest! {
        #[test]
        fn enclosing_clip_keeps_every_box(points in proptest::collection::vec((0.5f32..9.5, 0.5f32..9.5, 0.5f32..9.5), 1..20)) {
            let positions: Vec<Vec3> = points.iter().map(|&(x, y, z)| Vec3::new(x, y, z)).collect();
            let collection = translated(CollectionType::BoxCollection, &positions);
            let kept = filter_outside_clip_box(collection.clone(), &clip()).unwrap();
            prop_assert_eq!(kept, collection);
        }

        #[test]
        fn kept_boxes_always_touch_clip(points in proptest::collection::vec((-20f32..30.0, -20f32..30.0, -20f32..30.0), 1..20)) {
            let positions: Vec<Vec3> = points.iter().map(|&(x, y, z)| Vec3::new(x, y, z)).collect();
            let collection = translated(CollectionType::BoxCollection, &positions);
            if let Some(kept) = filter_outside_clip_box(collection, &clip()) {
                let Geometry::Instances(instances) = &kept.geometry else {
                    panic!("primitive collection lost its instances");
                };
                for i in 0..instances.count() {
                    let bounds = primitive_bounds(CollectionType::BoxCollection, instances, i).unwrap();
                    prop_assert!(bounds.intersects(&clip()));
                }
            }
        }
    }
}

//! View frustum built from a combined projection-view matrix.

use glam::{Mat4, Vec3, Vec4};

use crate::bounds::BoundingBox;

/// Six clipping planes, each stored as `(normal, distance)` with normals
/// pointing into the frustum.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    /// Extract planes from `projection * view`.
    ///
    /// The near plane is taken as `w + z >= 0`, which accepts matrices using
    /// either the `[-1, 1]` or the `[0, 1]` depth range. For the latter it is
    /// slightly conservative.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let r0 = matrix.row(0);
        let r1 = matrix.row(1);
        let r2 = matrix.row(2);
        let r3 = matrix.row(3);

        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r3 + r2, r3 - r2].map(normalize_plane);
        Self { planes }
    }

    /// Frustum for a camera, `inverse_camera` being the world-to-camera transform.
    pub fn from_camera(projection: &Mat4, inverse_camera: &Mat4) -> Self {
        Self::from_matrix(&(*projection * *inverse_camera))
    }

    /// Planes as `(normal, distance)`, normals pointing inwards.
    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    /// Whether `point` is inside all six planes.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(point) + plane.w >= 0.0)
    }

    /// Conservative box test: `false` only when the box is fully outside one plane.
    pub fn intersects_box(&self, bounds: &BoundingBox) -> bool {
        if bounds.is_empty() {
            return false;
        }
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            let positive = Vec3::new(
                if normal.x >= 0.0 { bounds.max.x } else { bounds.min.x },
                if normal.y >= 0.0 { bounds.max.y } else { bounds.min.y },
                if normal.z >= 0.0 { bounds.max.z } else { bounds.min.z },
            );
            normal.dot(positive) + plane.w >= 0.0
        })
    }
}

fn normalize_plane(plane: Vec4) -> Vec4 {
    let length = plane.truncate().length();
    if length > 0.0 {
        plane / length
    } else {
        plane
    }
}

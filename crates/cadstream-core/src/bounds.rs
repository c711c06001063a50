//! Axis-aligned bounding boxes and bounding spheres.

use glam::{Mat4, Vec3};

/// Axis-aligned bounding box.
///
/// A box is empty when `min` exceeds `max` on any axis. Boxes that only touch
/// along a face are still considered to intersect.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    /// Box spanning `min` to `max`.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An empty box, the identity for [`BoundingBox::union`].
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// Smallest box containing `points`, `None` when there are none.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut bounds = Self::empty();
        for p in points {
            bounds.expand_point(p);
        }
        (!bounds.is_empty()).then_some(bounds)
    }

    /// Box of `center ± radius` on every axis.
    pub fn from_center_radius(center: Vec3, radius: f32) -> Self {
        Self {
            min: center - Vec3::splat(radius),
            max: center + Vec3::splat(radius),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Extent along each axis.
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Midpoint of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Enclosed volume, zero for a degenerate box.
    pub fn volume(&self) -> f32 {
        let size = self.size();
        size.x * size.y * size.z
    }

    /// Merge with another bounding box.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Overlapping region of two boxes, `None` when they are disjoint.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let clipped = BoundingBox {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        };
        (!clipped.is_empty()).then_some(clipped)
    }

    /// Grow the box to include `point`.
    pub fn expand_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Check if a point is inside the bounding box.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Check if `other` lies completely inside this box.
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Check if two bounding boxes intersect.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// The eight corner points.
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Axis-aligned box enclosing this box after `matrix` is applied.
    pub fn transformed(&self, matrix: &Mat4) -> BoundingBox {
        if self.is_empty() {
            return *self;
        }
        let mut out = BoundingBox::empty();
        for corner in self.corners() {
            out.expand_point(matrix.transform_point3(corner));
        }
        out
    }
}

/// A bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Sphere of `radius` around `center`.
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere circumscribing a box. Overestimates the geometry it contains.
    pub fn from_box(bounds: &BoundingBox) -> Self {
        Self {
            center: bounds.center(),
            radius: bounds.size().length() * 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unit() -> BoundingBox {
        BoundingBox::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_from_points() {
        let bounds = BoundingBox::from_points([
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(-1.0, -1.0, -1.0),
        ])
        .unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 3.0));
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_intersection() {
        let other = BoundingBox::new(Vec3::splat(0.5), Vec3::splat(2.0));
        let clipped = unit().intersection(&other).unwrap();
        assert_eq!(clipped.min, Vec3::splat(0.5));
        assert_eq!(clipped.max, Vec3::ONE);

        let disjoint = BoundingBox::new(Vec3::splat(2.0), Vec3::splat(3.0));
        assert!(unit().intersection(&disjoint).is_none());
        assert!(!unit().intersects(&disjoint));
    }

    #[test]
    fn test_touching_boxes_intersect() {
        let touching = BoundingBox::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(unit().intersects(&touching));
        let clipped = unit().intersection(&touching).unwrap();
        assert_eq!(clipped.volume(), 0.0);
    }

    #[test]
    fn test_empty_box() {
        let empty = BoundingBox::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.volume(), 0.0);
        assert_eq!(empty.union(&unit()), unit());
    }

    #[test]
    fn test_transformed() {
        let matrix = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)) * Mat4::from_scale(Vec3::splat(2.0));
        let moved = unit().transformed(&matrix);
        assert_eq!(moved.min, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(moved.max, Vec3::new(12.0, 2.0, 2.0));
    }

    #[test]
    fn test_sphere_from_box() {
        let sphere = BoundingSphere::from_box(&BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
        assert_eq!(sphere.center, Vec3::ZERO);
        assert!((sphere.radius - 3.0_f32.sqrt()).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn intersection_is_contained_in_both(
            ax in -10.0f32..10.0, ay in -10.0f32..10.0, az in -10.0f32..10.0,
            bx in -10.0f32..10.0, by in -10.0f32..10.0, bz in -10.0f32..10.0,
            s in 0.1f32..10.0, t in 0.1f32..10.0,
        ) {
            let a = BoundingBox::new(Vec3::new(ax, ay, az), Vec3::new(ax + s, ay + s, az + s));
            let b = BoundingBox::new(Vec3::new(bx, by, bz), Vec3::new(bx + t, by + t, bz + t));
            match a.intersection(&b) {
                Some(c) => {
                    prop_assert!(a.contains_box(&c));
                    prop_assert!(b.contains_box(&c));
                    prop_assert!(a.intersects(&b));
                }
                None => prop_assert!(!a.intersects(&b)),
            }
        }
    }
}

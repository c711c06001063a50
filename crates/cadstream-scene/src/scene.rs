//! The sector tree of one model and its spatial queries.

use cadstream_core::{BoundingBox, Frustum};
use glam::{Mat4, Vec3};
use indexmap::IndexMap;

use crate::metadata::SectorMetadata;

/// Immutable sector tree.
///
/// The id map owns every node. Nodes refer to each other by id, and all
/// queries walk the tree depth-first from the root, skipping a whole subtree
/// as soon as its root fails the test.
#[derive(Debug, Clone)]
pub struct SectorScene {
    version: u32,
    max_tree_index: u32,
    unit: String,
    root: u32,
    sectors: IndexMap<u32, SectorMetadata>,
}

impl SectorScene {
    /// Assemble a scene from an already linked arena.
    ///
    /// Callers must guarantee that `root` is present and every node is
    /// reachable from it.
    pub(crate) fn from_parts(
        version: u32,
        max_tree_index: u32,
        unit: String,
        root: u32,
        sectors: IndexMap<u32, SectorMetadata>,
    ) -> Self {
        debug_assert!(sectors.contains_key(&root));
        Self {
            version,
            max_tree_index,
            unit,
            root,
            sectors,
        }
    }

    /// Scene file format version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Largest tree index of the model.
    pub fn max_tree_index(&self) -> u32 {
        self.max_tree_index
    }

    /// Unit of the model coordinates.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The root sector.
    pub fn root(&self) -> &SectorMetadata {
        &self.sectors[&self.root]
    }

    /// Bounds of the whole model.
    pub fn bounding_box(&self) -> BoundingBox {
        self.root().bounds
    }

    /// Number of sectors.
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    /// Sector `id`, if the scene has it.
    pub fn sector_by_id(&self, id: u32) -> Option<&SectorMetadata> {
        self.sectors.get(&id)
    }

    /// All sectors in input order.
    pub fn all_sectors(&self) -> impl Iterator<Item = &SectorMetadata> {
        self.sectors.values()
    }

    /// Direct children of `sector`.
    pub fn children<'a>(
        &'a self,
        sector: &'a SectorMetadata,
    ) -> impl Iterator<Item = &'a SectorMetadata> + 'a {
        sector
            .children
            .iter()
            .filter_map(move |id| self.sectors.get(id))
    }

    /// Parent of `sector`, `None` for the root.
    pub fn parent(&self, sector: &SectorMetadata) -> Option<&SectorMetadata> {
        sector.parent.and_then(|id| self.sectors.get(&id))
    }

    /// Depth-first pre-order traversal. Returning `false` from `visitor`
    /// skips the children of the visited sector.
    pub fn traverse<'a>(&'a self, mut visitor: impl FnMut(&'a SectorMetadata) -> bool) {
        let mut stack = vec![self.root()];
        while let Some(sector) = stack.pop() {
            if !visitor(sector) {
                continue;
            }
            // Push children in reverse order so they're visited left-to-right
            for id in sector.children.iter().rev() {
                if let Some(child) = self.sectors.get(id) {
                    stack.push(child);
                }
            }
        }
    }

    fn collect_where(&self, mut accept: impl FnMut(&SectorMetadata) -> bool) -> Vec<&SectorMetadata> {
        let mut found = Vec::new();
        self.traverse(|sector| {
            if accept(sector) {
                found.push(sector);
                true
            } else {
                false
            }
        });
        found
    }

    /// Sectors whose bounds contain `point`.
    pub fn sectors_containing_point(&self, point: Vec3) -> Vec<&SectorMetadata> {
        self.collect_where(|sector| sector.bounds.contains_point(point))
    }

    /// Sectors whose bounds intersect `bounds`.
    pub fn sectors_intersecting_box(&self, bounds: &BoundingBox) -> Vec<&SectorMetadata> {
        self.collect_where(|sector| sector.bounds.intersects(bounds))
    }

    /// Sectors visible from a camera. `inverse_camera` is the world-to-camera
    /// (view) matrix.
    pub fn sectors_intersecting_frustum(
        &self,
        projection: &Mat4,
        inverse_camera: &Mat4,
    ) -> Vec<&SectorMetadata> {
        let frustum = Frustum::from_camera(projection, inverse_camera);
        self.collect_where(|sector| frustum.intersects_box(&sector.bounds))
    }
}

//! Renderable meshes of a loaded sector.
//!
//! A [`SectorMeshGroup`] owns the meshes produced for one sector. Dropping
//! the group notifies the [`MaterialManager`] so per-model material state
//! can forget the sector.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use cadstream_core::{BoundingSphere, ModelIdentifier};
use cadstream_parser::{CollectionType, MeshBuffers, Texture};
use rustc_hash::FxHashMap;

/// Opaque handle of a material owned by a [`MaterialManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u32);

/// Provides materials for meshes and tracks which sectors use them.
pub trait MaterialManager {
    /// Material for meshes of `kind` in `model`.
    fn material(&self, model: &ModelIdentifier, kind: CollectionType) -> MaterialHandle;

    /// Called once when the geometry of a sector has been released.
    fn on_geometry_released(&self, model: &ModelIdentifier, sector_id: u32);
}

/// [`MaterialManager`] that hands out one material per model and kind.
#[derive(Debug, Default)]
pub struct BasicMaterialManager {
    materials: RefCell<FxHashMap<(u64, CollectionType), MaterialHandle>>,
    released: RefCell<Vec<(u64, u32)>>,
}

impl BasicMaterialManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of materials handed out so far.
    pub fn material_count(&self) -> usize {
        self.materials.borrow().len()
    }

    /// Sectors released so far, as `(model token, sector id)`.
    pub fn released(&self) -> Vec<(u64, u32)> {
        self.released.borrow().clone()
    }
}

impl MaterialManager for BasicMaterialManager {
    fn material(&self, model: &ModelIdentifier, kind: CollectionType) -> MaterialHandle {
        let mut materials = self.materials.borrow_mut();
        let next = MaterialHandle(materials.len() as u32);
        *materials.entry((model.token(), kind)).or_insert(next)
    }

    fn on_geometry_released(&self, model: &ModelIdentifier, sector_id: u32) {
        self.released.borrow_mut().push((model.token(), sector_id));
    }
}

/// One mesh ready for upload.
#[derive(Debug, Clone)]
pub struct RenderableMesh {
    pub kind: CollectionType,
    pub mesh: MeshBuffers,
    pub texture: Option<Texture>,
    pub material: MaterialHandle,
    /// Sphere around the owning sector, used for culling.
    pub bounding_sphere: BoundingSphere,
    /// Vertices per tree index.
    pub tree_index_counts: FxHashMap<u32, u32>,
}

impl RenderableMesh {
    /// Mesh ready for upload.
    pub fn new(
        kind: CollectionType,
        mesh: MeshBuffers,
        texture: Option<Texture>,
        material: MaterialHandle,
        bounding_sphere: BoundingSphere,
    ) -> Self {
        let mut tree_index_counts = FxHashMap::default();
        for &tree_index in &mesh.tree_indices {
            *tree_index_counts.entry(tree_index).or_insert(0) += 1;
        }
        Self {
            kind,
            mesh,
            texture,
            material,
            bounding_sphere,
            tree_index_counts,
        }
    }

    /// Approximate memory held by the mesh and its texture.
    pub fn byte_size(&self) -> usize {
        self.mesh.byte_size() + self.texture.as_ref().map_or(0, |t| t.data.len())
    }
}

/// Meshes of one sector.
pub struct SectorMeshGroup {
    model: ModelIdentifier,
    sector_id: u32,
    meshes: Vec<RenderableMesh>,
    materials: Rc<dyn MaterialManager>,
    released: Cell<bool>,
}

impl SectorMeshGroup {
    /// Group the meshes of one sector.
    pub fn new(
        model: ModelIdentifier,
        sector_id: u32,
        meshes: Vec<RenderableMesh>,
        materials: Rc<dyn MaterialManager>,
    ) -> Self {
        Self {
            model,
            sector_id,
            meshes,
            materials,
            released: Cell::new(false),
        }
    }

    /// Model the sector belongs to.
    pub fn model(&self) -> &ModelIdentifier {
        &self.model
    }

    /// Sector the meshes were loaded from.
    pub fn sector_id(&self) -> u32 {
        self.sector_id
    }

    /// Meshes of the sector.
    pub fn meshes(&self) -> &[RenderableMesh] {
        &self.meshes
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Approximate memory held by all meshes.
    pub fn byte_size(&self) -> usize {
        self.meshes.iter().map(RenderableMesh::byte_size).sum()
    }

    /// Release the geometry now instead of on drop. Idempotent.
    pub fn release(&self) {
        if !self.released.replace(true) {
            self.materials.on_geometry_released(&self.model, self.sector_id);
        }
    }
}

impl Drop for SectorMeshGroup {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SectorMeshGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectorMeshGroup")
            .field("model", &self.model)
            .field("sector_id", &self.sector_id)
            .field("meshes", &self.meshes.len())
            .finish()
    }
}

//! Sector metadata nodes.

use cadstream_core::BoundingBox;
use smallvec::SmallVec;

/// Coverage value meaning "not present in the source data".
pub const COVERAGE_SENTINEL: f32 = -1.0;

/// Coverage substituted when neither a sector nor any ancestor has data.
pub const DEFAULT_COVERAGE: f32 = 0.5;

/// Screen-coverage estimate per axis plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageFactors {
    pub xy: f32,
    pub yz: f32,
    pub xz: f32,
}

impl CoverageFactors {
    /// Marks factors that are missing from the scene file.
    pub const SENTINEL: CoverageFactors = CoverageFactors {
        xy: COVERAGE_SENTINEL,
        yz: COVERAGE_SENTINEL,
        xz: COVERAGE_SENTINEL,
    };

    /// Factors used when no ancestor has any.
    pub const DEFAULT: CoverageFactors = CoverageFactors {
        xy: DEFAULT_COVERAGE,
        yz: DEFAULT_COVERAGE,
        xz: DEFAULT_COVERAGE,
    };

    /// Whether the factors carry real data.
    pub fn is_valid(&self) -> bool {
        self.xy >= 0.0 && self.yz >= 0.0 && self.xz >= 0.0
    }
}

/// Descriptor of the detailed geometry file of a sector.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexFile {
    pub file_name: String,
    pub peripheral_files: Vec<String>,
    pub download_size: u64,
}

/// Descriptor of the simplified (faces) geometry of a sector.
#[derive(Debug, Clone, PartialEq)]
pub struct FacesFile {
    pub quad_size: f32,
    pub coverage_factors: CoverageFactors,
    pub recursive_coverage_factors: CoverageFactors,
    pub file_name: Option<String>,
    pub download_size: u64,
}

impl FacesFile {
    /// Faces file for a sector whose source record had none.
    pub fn placeholder() -> Self {
        Self {
            quad_size: -1.0,
            coverage_factors: CoverageFactors::SENTINEL,
            recursive_coverage_factors: CoverageFactors::SENTINEL,
            file_name: None,
            download_size: 0,
        }
    }

    /// Whether this sector carries its own coverage data.
    pub fn has_coverage(&self) -> bool {
        self.coverage_factors.is_valid()
    }
}

/// One node of the sector tree.
///
/// Children and parent are stored as sector ids; the owning
/// [`crate::SectorScene`] resolves them.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorMetadata {
    pub id: u32,
    pub path: String,
    pub depth: u32,
    pub bounds: BoundingBox,
    pub index_file: IndexFile,
    pub faces_file: FacesFile,
    pub estimated_draw_call_count: u32,
    pub estimated_rendering_cost: f32,
    pub(crate) parent: Option<u32>,
    pub(crate) children: SmallVec<[u32; 8]>,
}

impl SectorMetadata {
    /// Id of the parent sector, `None` for the root.
    pub fn parent_id(&self) -> Option<u32> {
        self.parent
    }

    pub fn child_ids(&self) -> &[u32] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Total bytes of the detailed geometry.
    pub fn download_size(&self) -> u64 {
        self.index_file.download_size
    }
}

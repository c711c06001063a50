//! Sector metadata parser.
//!
//! Builds a [`SectorScene`] from the flat sector list of a scene document in
//! two passes: every node is created first, then parent and child links are
//! wired. Input order is therefore irrelevant. Sectors lacking coverage data
//! inherit it from their nearest ancestor that has some.

use cadstream_core::BoundingBox;
use glam::Vec3;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::document::{BoxRecord, CoverageRecord, FacesFileRecord, SceneDocument, SectorRecord};
use crate::error::{Result, SceneError};
use crate::metadata::{CoverageFactors, FacesFile, IndexFile, SectorMetadata};
use crate::scene::SectorScene;

/// Scene format versions this parser understands.
pub const SUPPORTED_VERSIONS: [u32; 2] = [8, 9];

/// Version assumed by [`parse_sectors`].
pub const DEFAULT_VERSION: u32 = 9;

/// Parse raw `scene.json` bytes.
pub fn parse_scene_json(data: &[u8]) -> Result<SectorScene> {
    let document: SceneDocument = serde_json::from_slice(data)?;
    parse_scene_document(&document)
}

/// Parse an already decoded JSON value.
pub fn parse_scene_value(value: serde_json::Value) -> Result<SectorScene> {
    let document: SceneDocument = serde_json::from_value(value)?;
    parse_scene_document(&document)
}

/// Build a [`SectorScene`] from an already decoded document.
pub fn parse_scene_document(document: &SceneDocument) -> Result<SectorScene> {
    if !SUPPORTED_VERSIONS.contains(&document.version) {
        return Err(SceneError::UnsupportedVersion(document.version));
    }
    build_scene(
        document.version,
        document.max_tree_index,
        document.unit.clone(),
        &document.sectors,
    )
}

/// Parse a bare sector list.
pub fn parse_sectors(records: &[SectorRecord]) -> Result<SectorScene> {
    build_scene(DEFAULT_VERSION, 0, "Meters".to_string(), records)
}

fn build_scene(
    version: u32,
    max_tree_index: u32,
    unit: String,
    records: &[SectorRecord],
) -> Result<SectorScene> {
    if records.is_empty() {
        return Err(SceneError::malformed("sector list is empty"));
    }

    // Pass 1: create every node, keeping declared parents aside
    let mut sectors: IndexMap<u32, SectorMetadata> = IndexMap::with_capacity(records.len());
    let mut declared_parents: Vec<(u32, u32)> = Vec::with_capacity(records.len());
    let mut root: Option<u32> = None;

    for record in records {
        if sectors.contains_key(&record.id) {
            return Err(SceneError::malformed(format!("duplicate sector id {}", record.id)));
        }
        match record.declared_parent() {
            Some(parent) => declared_parents.push((record.id, parent)),
            None => {
                if let Some(existing) = root {
                    return Err(SceneError::malformed(format!(
                        "sectors {existing} and {} are both marked as root",
                        record.id
                    )));
                }
                root = Some(record.id);
            }
        }
        sectors.insert(record.id, sector_from_record(record));
    }

    let root = root.ok_or_else(|| SceneError::malformed("no sector has parent id -1"))?;

    // Pass 2: wire parent and child links
    for &(child, parent) in &declared_parents {
        let parent_node = sectors.get_mut(&parent).ok_or_else(|| {
            SceneError::malformed(format!("sector {child} refers to missing parent {parent}"))
        })?;
        parent_node.children.push(child);
        if let Some(child_node) = sectors.get_mut(&child) {
            child_node.parent = Some(parent);
        }
    }

    ensure_reachable(&sectors, root)?;
    backfill_coverage(&mut sectors);
    warn_on_uncontained_bounds(&sectors);

    Ok(SectorScene::from_parts(version, max_tree_index, unit, root, sectors))
}

fn sector_from_record(record: &SectorRecord) -> SectorMetadata {
    SectorMetadata {
        id: record.id,
        path: record.path.clone(),
        depth: record.depth,
        bounds: bounds_from_record(&record.bounding_box),
        index_file: IndexFile {
            file_name: record.index_file.file_name.clone(),
            peripheral_files: record.index_file.peripheral_files.clone(),
            download_size: record.index_file.download_size,
        },
        faces_file: record
            .faces_file
            .as_ref()
            .map(faces_from_record)
            .unwrap_or_else(FacesFile::placeholder),
        estimated_draw_call_count: record.estimated_draw_call_count,
        estimated_rendering_cost: record.estimated_rendering_cost,
        parent: None,
        children: SmallVec::new(),
    }
}

fn bounds_from_record(record: &BoxRecord) -> BoundingBox {
    BoundingBox::new(
        Vec3::new(record.min.x, record.min.y, record.min.z),
        Vec3::new(record.max.x, record.max.y, record.max.z),
    )
}

fn coverage_from_record(record: &CoverageRecord) -> CoverageFactors {
    CoverageFactors {
        xy: record.xy,
        yz: record.yz,
        xz: record.xz,
    }
}

fn faces_from_record(record: &FacesFileRecord) -> FacesFile {
    FacesFile {
        quad_size: record.quad_size,
        coverage_factors: coverage_from_record(&record.coverage_factors),
        recursive_coverage_factors: coverage_from_record(&record.recursive_coverage_factors),
        file_name: record.file_name.clone(),
        download_size: record.download_size,
    }
}

/// Reject cycles and islands that pass the parent checks but hang off no root.
fn ensure_reachable(sectors: &IndexMap<u32, SectorMetadata>, root: u32) -> Result<()> {
    let mut visited = 0usize;
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        visited += 1;
        if visited > sectors.len() {
            break;
        }
        if let Some(node) = sectors.get(&id) {
            stack.extend(node.children.iter().copied());
        }
    }
    if visited != sectors.len() {
        return Err(SceneError::malformed(format!(
            "{} of {} sectors are not reachable from root {root}",
            sectors.len().saturating_sub(visited),
            sectors.len()
        )));
    }
    Ok(())
}

/// Give every sector without its own coverage the recursive coverage of the
/// nearest ancestor that has valid data, or the default.
fn backfill_coverage(sectors: &mut IndexMap<u32, SectorMetadata>) {
    // Snapshot source data so filled-in values never feed later lookups
    let source: FxHashMap<u32, (Option<u32>, Option<CoverageFactors>)> = sectors
        .values()
        .map(|s| {
            let recursive = s.faces_file.recursive_coverage_factors;
            (s.id, (s.parent, recursive.is_valid().then_some(recursive)))
        })
        .collect();

    for sector in sectors.values_mut() {
        if sector.faces_file.has_coverage() {
            continue;
        }
        let mut coverage = CoverageFactors::DEFAULT;
        let mut ancestor = sector.parent;
        while let Some(id) = ancestor {
            let Some(&(parent, recursive)) = source.get(&id) else {
                break;
            };
            if let Some(found) = recursive {
                coverage = found;
                break;
            }
            ancestor = parent;
        }
        sector.faces_file.coverage_factors = coverage;
        sector.faces_file.recursive_coverage_factors = coverage;
    }
}

fn warn_on_uncontained_bounds(sectors: &IndexMap<u32, SectorMetadata>) {
    for sector in sectors.values() {
        let Some(parent) = sector.parent.and_then(|id| sectors.get(&id)) else {
            continue;
        };
        if !parent.bounds.contains_box(&sector.bounds) {
            log::warn!(
                "sector {} bounds {:?} exceed parent {} bounds {:?}; spatial queries may skip it",
                sector.id,
                sector.bounds,
                parent.id,
                parent.bounds
            );
        }
    }
}

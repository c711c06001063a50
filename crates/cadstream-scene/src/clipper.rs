//! Derive a spatially clipped scene from an existing one.

use cadstream_core::BoundingBox;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::error::{Result, SceneError};
use crate::metadata::SectorMetadata;
use crate::scene::SectorScene;

/// Clip every sector of `scene` against `clip_box`.
///
/// Sectors whose bounds do not touch the clip box are dropped together with
/// their subtrees. Surviving sectors get the intersected bounds and a draw
/// call estimate scaled by the kept share of their volume, rounded up. The
/// input scene is left untouched.
pub fn create_clipped_model(scene: &SectorScene, clip_box: &BoundingBox) -> Result<SectorScene> {
    let root = scene.root();
    if root.bounds.intersection(clip_box).is_none() {
        return Err(SceneError::EmptyClipIntersection);
    }

    let mut sectors = IndexMap::with_capacity(scene.sector_count());
    clip_sector(scene, root, None, clip_box, &mut sectors);

    log::debug!(
        "clipped scene from {} to {} sectors",
        scene.sector_count(),
        sectors.len()
    );

    Ok(SectorScene::from_parts(
        scene.version(),
        scene.max_tree_index(),
        scene.unit().to_string(),
        root.id,
        sectors,
    ))
}

/// Returns `false` when the sector was dropped.
fn clip_sector(
    scene: &SectorScene,
    sector: &SectorMetadata,
    parent: Option<u32>,
    clip_box: &BoundingBox,
    out: &mut IndexMap<u32, SectorMetadata>,
) -> bool {
    let Some(bounds) = sector.bounds.intersection(clip_box) else {
        return false;
    };

    let original_volume = sector.bounds.volume();
    let ratio = if original_volume > 0.0 {
        bounds.volume() / original_volume
    } else {
        1.0
    };

    // Parents go in before children so the arena stays in pre-order
    out.insert(
        sector.id,
        SectorMetadata {
            bounds,
            estimated_draw_call_count: (sector.estimated_draw_call_count as f64 * ratio as f64)
                .ceil() as u32,
            estimated_rendering_cost: sector.estimated_rendering_cost * ratio,
            parent,
            children: SmallVec::new(),
            ..sector.clone()
        },
    );

    let kept: SmallVec<[u32; 8]> = scene
        .children(sector)
        .filter(|child| clip_sector(scene, child, Some(sector.id), clip_box, out))
        .map(|child| child.id)
        .collect();

    if let Some(clipped) = out.get_mut(&sector.id) {
        clipped.children = kept;
    }
    true
}

//! Fetching and decoding of single sectors.

use std::rc::Rc;

use cadstream_core::{BoundingSphere, CancellationToken};
use cadstream_io::BinaryFileProvider;
use cadstream_parser::{filter_outside_clip_box, parse_sector, Geometry, GeometryCollection};
use futures::future::{self, Either, FutureExt, LocalBoxFuture};

use crate::error::LoadError;
use crate::group::{MaterialManager, RenderableMesh, SectorMeshGroup};
use crate::sector::{ConsumedSector, ParsedGeometry, WantedSector};

/// Turns a [`WantedSector`] into a [`ConsumedSector`].
pub trait SectorLoader {
    fn load_sector<'a>(
        &'a self,
        sector: &'a WantedSector,
        cancel: Option<&'a CancellationToken>,
    ) -> LocalBoxFuture<'a, Result<ConsumedSector, LoadError>>;
}

/// Loader for sectors stored as binary sector files.
///
/// Primitive and instanced collections are queued for batching; plain
/// triangle meshes become [`RenderableMesh`]es grouped per sector.
pub struct GltfSectorLoader {
    provider: Rc<dyn BinaryFileProvider>,
    materials: Rc<dyn MaterialManager>,
}

impl GltfSectorLoader {
    /// Create a loader fetching through `provider`.
    pub fn new(provider: Rc<dyn BinaryFileProvider>, materials: Rc<dyn MaterialManager>) -> Self {
        Self {
            provider,
            materials,
        }
    }

    async fn load(
        &self,
        sector: &WantedSector,
        cancel: Option<&CancellationToken>,
    ) -> Result<ConsumedSector, LoadError> {
        let Some(file_name) = sector.file_name() else {
            return Ok(ConsumedSector::empty(sector, sector.level_of_detail));
        };
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(LoadError::Cancelled);
        }

        let fetch = self
            .provider
            .get_binary_file(&sector.model_base_url, file_name, cancel);
        let bytes = match cancel {
            Some(token) => match future::select(fetch, token.cancelled()).await {
                Either::Left((result, _)) => result?,
                Either::Right(_) => return Err(LoadError::Cancelled),
            },
            None => fetch.await?,
        };
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(LoadError::Cancelled);
        }

        let collections = parse_sector(&bytes)?;
        Ok(self.consume(sector, collections))
    }

    fn consume(&self, sector: &WantedSector, collections: Vec<GeometryCollection>) -> ConsumedSector {
        let sector_id = sector.sector_id();
        let sphere = BoundingSphere::from_box(&sector.metadata.bounds);
        let mut meshes = Vec::new();
        let mut batched = Vec::new();

        let kept = collections.into_iter().filter_map(|collection| match &sector.geometry_clip_box {
            Some(clip_box) => filter_outside_clip_box(collection, clip_box),
            None => Some(collection),
        });
        for collection in kept {
            match collection {
                GeometryCollection {
                    kind,
                    geometry: Geometry::Mesh(mesh),
                    texture,
                    ..
                } if !kind.is_batched() => {
                    let material = self.materials.material(&sector.model, kind);
                    meshes.push(RenderableMesh::new(kind, mesh, texture, material, sphere));
                }
                other => batched.push(ParsedGeometry {
                    kind: other.kind,
                    sector_id,
                    collection: Rc::new(other),
                }),
            }
        }

        let group = (!meshes.is_empty()).then(|| {
            Rc::new(SectorMeshGroup::new(
                sector.model.clone(),
                sector_id,
                meshes,
                Rc::clone(&self.materials),
            ))
        });
        ConsumedSector {
            model: sector.model.clone(),
            metadata: sector.metadata.clone(),
            level_of_detail: sector.level_of_detail,
            group,
            batched,
        }
    }
}

impl SectorLoader for GltfSectorLoader {
    fn load_sector<'a>(
        &'a self,
        sector: &'a WantedSector,
        cancel: Option<&'a CancellationToken>,
    ) -> LocalBoxFuture<'a, Result<ConsumedSector, LoadError>> {
        async move {
            self.load(sector, cancel).await.map_err(|err| {
                report(sector, &err);
                err
            })
        }
        .boxed_local()
    }
}

fn report(sector: &WantedSector, err: &LoadError) {
    if err.is_cancelled() {
        log::debug!("load of sector {} ({}) cancelled", sector.sector_id(), sector.model);
    } else if err.is_invalid_model() {
        log::error!(
            "sector {} of model {} is not a valid sector file: {err}",
            sector.sector_id(),
            sector.model
        );
    } else {
        log::error!(
            "failed to load sector {} of model {}: {err}",
            sector.sector_id(),
            sector.model
        );
    }
}


#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use crate::group::BasicMaterialManager;
    use crate::sector::LevelOfDetail;
    use cadstream_core::{BoundingBox, ModelIdentifier};
    use cadstream_parser::CollectionType;
    use futures::executor::block_on;
    use glam::Vec3;

    fn loader(provider: MockFileProvider) -> (Rc<MockFileProvider>, Rc<BasicMaterialManager>, GltfSectorLoader) {
        let provider = Rc::new(provider);
        let materials = Rc::new(BasicMaterialManager::new());
        let loader = GltfSectorLoader::new(provider.clone(), materials.clone());
        (provider, materials, loader)
    }

    fn with_sectors() -> MockFileProvider {
        MockFileProvider::new()
            .with_file("sector_0.glb", sector_bytes())
            .with_file("sector_1.glb", sector_bytes())
            .with_file("sector_1.f3d", sector_bytes())
    }

    #[test]
    fn test_discarded_fetches_nothing() {
        let (provider, _, loader) = loader(with_sectors());
        let model = ModelIdentifier::local("m");
        let wanted = wanted(&scene(), &model, 1, LevelOfDetail::Discarded);
        let consumed = block_on(loader.load_sector(&wanted, None)).unwrap();
        assert_eq!(consumed.level_of_detail, LevelOfDetail::Discarded);
        assert!(consumed.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_simple_without_faces_file_is_empty() {
        let (provider, _, loader) = loader(with_sectors());
        let model = ModelIdentifier::local("m");
        let wanted = wanted(&scene(), &model, 2, LevelOfDetail::Simple);
        let consumed = block_on(loader.load_sector(&wanted, None)).unwrap();
        assert_eq!(consumed.level_of_detail, LevelOfDetail::Simple);
        assert!(consumed.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_simple_fetches_faces_file() {
        let (provider, _, loader) = loader(with_sectors());
        let model = ModelIdentifier::local("m");
        let wanted = wanted(&scene(), &model, 1, LevelOfDetail::Simple);
        let consumed = block_on(loader.load_sector(&wanted, None)).unwrap();
        assert_eq!(consumed.level_of_detail, LevelOfDetail::Simple);
        assert_eq!(provider.calls.borrow()[0], "http://localhost/model/sector_1.f3d");
    }

    #[test]
    fn test_detailed_splits_batched_and_meshes() {
        let (provider, materials, loader) = loader(with_sectors());
        let model = ModelIdentifier::local("m");
        let wanted = wanted(&scene(), &model, 0, LevelOfDetail::Detailed);
        let consumed = block_on(loader.load_sector(&wanted, None)).unwrap();

        assert_eq!(provider.calls.borrow()[0], "http://localhost/model/sector_0.glb");
        assert_eq!(consumed.level_of_detail, LevelOfDetail::Detailed);
        assert_eq!(consumed.batched.len(), 1);
        assert_eq!(consumed.batched[0].kind, CollectionType::BoxCollection);
        assert_eq!(consumed.batched[0].sector_id, 0);
        assert_eq!(consumed.batched[0].collection.instance_count(), 2);

        let group = consumed.group.clone().unwrap();
        assert_eq!(group.len(), 1);
        let mesh = &group.meshes()[0];
        assert_eq!(mesh.tree_index_counts[&3], 2);
        assert_eq!(mesh.tree_index_counts[&4], 1);
        assert_eq!(mesh.bounding_sphere.center, Vec3::splat(8.0));
        assert!(consumed.byte_size() > 0);

        drop(group);
        drop(consumed);
        assert_eq!(materials.released(), vec![(model.token(), 0)]);
    }

    #[test]
    fn test_clip_box_filters_geometry() {
        let (_, _, loader) = loader(with_sectors());
        let model = ModelIdentifier::local("m");
        let scene = scene();

        let near = wanted(&scene, &model, 0, LevelOfDetail::Detailed)
            .with_clip_box(Some(BoundingBox::new(Vec3::ZERO, Vec3::splat(8.0))));
        let consumed = block_on(loader.load_sector(&near, None)).unwrap();
        assert_eq!(consumed.batched[0].collection.instance_count(), 1);
        assert!(consumed.group.is_some());

        let far = wanted(&scene, &model, 0, LevelOfDetail::Detailed)
            .with_clip_box(Some(BoundingBox::new(Vec3::splat(10.0), Vec3::splat(16.0))));
        let consumed = block_on(loader.load_sector(&far, None)).unwrap();
        assert_eq!(consumed.batched[0].collection.instance_count(), 1);
        assert!(consumed.group.is_none());

        let outside = wanted(&scene, &model, 0, LevelOfDetail::Detailed)
            .with_clip_box(Some(BoundingBox::new(Vec3::splat(100.0), Vec3::splat(101.0))));
        let consumed = block_on(loader.load_sector(&outside, None)).unwrap();
        assert!(consumed.is_empty());
    }

    #[test]
    fn test_cancelled_before_fetch() {
        let (provider, _, loader) = loader(with_sectors());
        let model = ModelIdentifier::local("m");
        let wanted = wanted(&scene(), &model, 0, LevelOfDetail::Detailed);
        let token = CancellationToken::new();
        token.cancel();
        let err = block_on(loader.load_sector(&wanted, Some(&token))).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_cancelled_during_fetch() {
        let (provider, _, loader) = loader(with_sectors());
        let _gate = provider.gate();
        let model = ModelIdentifier::local("m");
        let wanted = wanted(&scene(), &model, 0, LevelOfDetail::Detailed);
        let token = CancellationToken::new();
        let (result, ()) = block_on(async {
            futures::join!(loader.load_sector(&wanted, Some(&token)), async {
                token.cancel();
            })
        });
        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let (_, _, loader) = loader(with_sectors());
        let model = ModelIdentifier::local("m");
        let wanted = wanted(&scene(), &model, 2, LevelOfDetail::Detailed);
        let err = block_on(loader.load_sector(&wanted, None)).unwrap_err();
        assert!(matches!(err, LoadError::Io(ref io) if io.status() == Some(404)));
    }

    #[test]
    fn test_garbage_is_invalid_model() {
        let (_, _, loader) = loader(MockFileProvider::new().with_file("sector_0.glb", b"not a sector".to_vec()));
        let model = ModelIdentifier::local("m");
        let wanted = wanted(&scene(), &model, 0, LevelOfDetail::Detailed);
        let err = block_on(loader.load_sector(&wanted, None)).unwrap_err();
        assert!(err.is_invalid_model());
    }
}

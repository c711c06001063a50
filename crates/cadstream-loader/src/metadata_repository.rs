//! Resolution of a model identifier to its sector scene and placement.

use std::rc::Rc;

use cadstream_core::{BoundingBox, ModelIdentifier};
use cadstream_io::{CameraConfiguration, JsonFileProvider, ModelMetadataProvider};
use cadstream_scene::{create_clipped_model, parse_scene_value, SectorScene};
use glam::Mat4;

use crate::error::MetadataError;
use crate::sector::{LevelOfDetail, WantedSector};

/// Name of the scene file stored next to the sector files.
pub const DEFAULT_SCENE_FILE: &str = "scene.json";

/// Everything needed to schedule the sectors of one model.
#[derive(Debug, Clone)]
pub struct CadModelMetadata {
    pub model: ModelIdentifier,
    pub model_base_url: String,
    /// Model space to viewer space.
    pub model_matrix: Mat4,
    pub inverse_model_matrix: Mat4,
    pub camera: Option<CameraConfiguration>,
    pub scene: Rc<SectorScene>,
    /// Clip box in model space, applied to both the scene and the geometry.
    pub geometry_clip_box: Option<BoundingBox>,
}

impl CadModelMetadata {
    /// Bounds of the model in viewer space.
    pub fn bounding_box(&self) -> BoundingBox {
        self.scene.bounding_box().transformed(&self.model_matrix)
    }

    /// Request for one sector of this model.
    pub fn wanted_sector(&self, sector_id: u32, level_of_detail: LevelOfDetail) -> Option<WantedSector> {
        let metadata = self.scene.sector_by_id(sector_id)?.clone();
        Some(
            WantedSector::new(
                self.model.clone(),
                self.model_base_url.clone(),
                level_of_detail,
                metadata,
            )
            .with_clip_box(self.geometry_clip_box),
        )
    }
}

/// Loads [`CadModelMetadata`] from a metadata provider and a data provider.
pub struct CadModelMetadataRepository {
    metadata: Rc<dyn ModelMetadataProvider>,
    data: Rc<dyn JsonFileProvider>,
    scene_file_name: String,
}

impl CadModelMetadataRepository {
    /// Create a repository resolving models through `metadata`.
    pub fn new(metadata: Rc<dyn ModelMetadataProvider>, data: Rc<dyn JsonFileProvider>) -> Self {
        Self {
            metadata,
            data,
            scene_file_name: DEFAULT_SCENE_FILE.to_string(),
        }
    }

    /// Use `name` instead of [`DEFAULT_SCENE_FILE`].
    pub fn with_scene_file_name(mut self, name: impl Into<String>) -> Self {
        self.scene_file_name = name.into();
        self
    }

    /// Resolve `model`, fetch and parse its scene and clip it if asked.
    pub async fn load_data(
        &self,
        model: &ModelIdentifier,
        geometry_clip_box: Option<BoundingBox>,
    ) -> Result<CadModelMetadata, MetadataError> {
        let (model_base_url, model_matrix, camera) = futures::try_join!(
            self.metadata.model_uri(model),
            self.metadata.model_matrix(model),
            self.metadata.model_camera(model),
        )?;

        let json = self
            .data
            .get_json_file(&model_base_url, &self.scene_file_name)
            .await?;
        let mut scene = parse_scene_value(json)?;
        if let Some(clip_box) = &geometry_clip_box {
            scene = create_clipped_model(&scene, clip_box)?;
        }
        log::info!(
            "loaded scene of {model} with {} sectors from {model_base_url}",
            scene.sector_count()
        );

        Ok(CadModelMetadata {
            model: model.clone(),
            model_base_url,
            model_matrix,
            inverse_model_matrix: model_matrix.inverse(),
            camera,
            scene: Rc::new(scene),
            geometry_clip_box,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::mock::scene_json;
    use cadstream_core::ModelFormat;
    use cadstream_io::{join_url, platform_to_viewer, IoError, LocalModelMetadataProvider};
    use cadstream_scene::SceneError;
    use futures::executor::block_on;
    use futures::future::{self, FutureExt, LocalBoxFuture};
    use glam::Vec3;
    use std::cell::RefCell;

    struct SceneFile {
        value: serde_json::Value,
        urls: RefCell<Vec<String>>,
    }

    impl JsonFileProvider for SceneFile {
        fn get_json_file<'a>(
            &'a self,
            base_url: &'a str,
            file_name: &'a str,
        ) -> LocalBoxFuture<'a, cadstream_io::Result<serde_json::Value>> {
            self.urls.borrow_mut().push(join_url(base_url, file_name));
            future::ready(Ok(self.value.clone())).boxed_local()
        }
    }

    fn repository(value: serde_json::Value) -> (Rc<SceneFile>, CadModelMetadataRepository) {
        let data = Rc::new(SceneFile {
            value,
            urls: RefCell::new(Vec::new()),
        });
        let metadata = Rc::new(LocalModelMetadataProvider::new("http://localhost"));
        (data.clone(), CadModelMetadataRepository::new(metadata, data))
    }

    #[test]
    fn test_load_local_model() {
        let (data, repository) = repository(scene_json());
        let model = ModelIdentifier::local("primitives");
        let metadata = block_on(repository.load_data(&model, None)).unwrap();

        assert_eq!(data.urls.borrow()[0], "http://localhost/primitives/scene.json");
        assert_eq!(metadata.model_base_url, "http://localhost/primitives");
        assert_eq!(metadata.model_matrix, platform_to_viewer());
        assert!(metadata.camera.is_none());
        assert_eq!(metadata.scene.sector_count(), 3);
        assert!(metadata.geometry_clip_box.is_none());

        let product = metadata.model_matrix * metadata.inverse_model_matrix;
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-5));

        let wanted = metadata.wanted_sector(1, LevelOfDetail::Detailed).unwrap();
        assert_eq!(wanted.model, model);
        assert_eq!(wanted.file_name(), Some("sector_1.glb"));
        assert!(metadata.wanted_sector(42, LevelOfDetail::Detailed).is_none());
    }

    #[test]
    fn test_viewer_space_bounds() {
        let (_, repository) = repository(scene_json());
        let metadata = block_on(repository.load_data(&ModelIdentifier::local("m"), None)).unwrap();
        let bounds = metadata.bounding_box();
        // Z-up [0, 16] becomes Y-up with Z flipped
        assert!((bounds.min - Vec3::new(0.0, 0.0, -16.0)).length() < 1e-4);
        assert!((bounds.max - Vec3::new(16.0, 16.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_clip_box_applies_to_scene_and_sectors() {
        let (_, repository) = repository(scene_json());
        let clip_box = BoundingBox::new(Vec3::ZERO, Vec3::splat(4.0));
        let metadata = block_on(repository.load_data(&ModelIdentifier::local("m"), Some(clip_box))).unwrap();

        assert_eq!(metadata.scene.sector_count(), 2);
        assert!(metadata.scene.sector_by_id(2).is_none());
        assert_eq!(metadata.scene.bounding_box(), clip_box);
        let wanted = metadata.wanted_sector(1, LevelOfDetail::Detailed).unwrap();
        assert_eq!(wanted.geometry_clip_box, Some(clip_box));
    }

    #[test]
    fn test_custom_scene_file_name() {
        let (data, repository) = repository(scene_json());
        let repository = repository.with_scene_file_name("index.json");
        block_on(repository.load_data(&ModelIdentifier::local("m"), None)).unwrap();
        assert_eq!(data.urls.borrow()[0], "http://localhost/m/index.json");
    }

    #[test]
    fn test_unsupported_source() {
        let (data, repository) = repository(scene_json());
        let model = ModelIdentifier::cdf(1, 2, ModelFormat::RevealCadModel);
        let err = block_on(repository.load_data(&model, None)).unwrap_err();
        assert!(matches!(err, MetadataError::Io(IoError::UnsupportedSource(_))));
        assert!(data.urls.borrow().is_empty());
    }

    #[test]
    fn test_bad_scene_version() {
        let mut json = scene_json();
        json["version"] = 3.into();
        let (_, repository) = repository(json);
        let err = block_on(repository.load_data(&ModelIdentifier::local("m"), None)).unwrap_err();
        assert!(matches!(err, MetadataError::Scene(SceneError::UnsupportedVersion(3))));
    }
}

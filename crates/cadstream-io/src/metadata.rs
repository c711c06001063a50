//! Model metadata provider trait.

use cadstream_core::ModelIdentifier;
use futures::future::LocalBoxFuture;
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

use crate::error::Result;

/// Default camera stored with a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConfiguration {
    pub position: Vec3,
    pub target: Vec3,
}

impl CameraConfiguration {
    /// Camera moved into the space of `matrix`.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            position: matrix.transform_point3(self.position),
            target: matrix.transform_point3(self.target),
        }
    }
}

/// Transform from the platform's Z-up frame to the viewer's Y-up frame.
pub fn platform_to_viewer() -> Mat4 {
    Mat4::from_rotation_x(-FRAC_PI_2)
}

/// Resolves a model identifier to where and how the model is placed.
pub trait ModelMetadataProvider {
    /// Base URL of the model's files.
    fn model_uri<'a>(&'a self, model: &'a ModelIdentifier) -> LocalBoxFuture<'a, Result<String>>;

    /// Transform from model space to viewer space.
    fn model_matrix<'a>(&'a self, model: &'a ModelIdentifier) -> LocalBoxFuture<'a, Result<Mat4>>;

    fn model_camera<'a>(
        &'a self,
        model: &'a ModelIdentifier,
    ) -> LocalBoxFuture<'a, Result<Option<CameraConfiguration>>>;
}

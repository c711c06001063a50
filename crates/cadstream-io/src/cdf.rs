//! Providers for models stored on the cloud platform.

use std::rc::Rc;

use cadstream_core::{CancellationToken, ModelIdentifier, ModelSource};
use futures::future::{FutureExt, LocalBoxFuture};
use glam::{EulerRot, Mat4, Vec3};
use serde::Deserialize;

use crate::auth::TokenProvider;
use crate::error::{IoError, Result};
use crate::http::{HttpClient, HttpRequest};
use crate::metadata::{platform_to_viewer, CameraConfiguration, ModelMetadataProvider};
use crate::options::CdfClientOptions;
use crate::outputs::{ModelOutputList, OutputsResponse};
use crate::provider::{join_url, BinaryFileProvider, JsonFileProvider};

/// Authenticated GET with bounded retries.
///
/// Transport failures, `5xx` and `429` are retried. A `401` triggers
/// reauthentication and another attempt. Both share one attempt budget, and
/// when the budget runs out the first error seen is returned.
#[derive(Clone)]
pub struct CdfClient {
    http: Rc<dyn HttpClient>,
    tokens: Rc<dyn TokenProvider>,
    options: CdfClientOptions,
}

impl CdfClient {
    /// Create a client sending requests through `http`.
    pub fn new(
        http: Rc<dyn HttpClient>,
        tokens: Rc<dyn TokenProvider>,
        options: CdfClientOptions,
    ) -> Self {
        Self {
            http,
            tokens,
            options,
        }
    }

    /// Options the client was built with.
    pub fn options(&self) -> &CdfClientOptions {
        &self.options
    }

    /// Authenticated GET of `url`, retried on transient failures.
    pub async fn get(&self, url: &str, cancel: Option<&CancellationToken>) -> Result<Vec<u8>> {
        let max_attempts = self.options.max_attempts.max(1);
        let mut token = self.tokens.token().await?;
        let mut first_error: Option<IoError> = None;

        for attempt in 1..=max_attempts {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(IoError::Cancelled);
            }

            let outcome = self
                .http
                .get(HttpRequest::get(url).with_bearer(&token))
                .await;
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(IoError::Cancelled);
            }

            let error = match outcome {
                Ok(response) if response.is_success() => return Ok(response.body),
                Ok(response) if response.status == 401 => {
                    let error = IoError::http(401, url);
                    match self.tokens.reauthenticate().await {
                        Ok(fresh) => {
                            log::debug!("reauthenticated after 401 from {url}");
                            token = fresh;
                            error
                        }
                        Err(auth) => {
                            log::warn!("reauthentication for {url} failed: {auth}");
                            return Err(first_error.unwrap_or(error));
                        }
                    }
                }
                Ok(response) if response.is_transient() => IoError::http(response.status, url),
                Ok(response) => {
                    return Err(first_error.unwrap_or(IoError::http(response.status, url)));
                }
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => err,
            };

            log::debug!("attempt {attempt}/{max_attempts} for {url} failed: {error}");
            first_error.get_or_insert(error);
        }

        let error = first_error.unwrap_or_else(|| IoError::transport("no attempt was made"));
        log::warn!("giving up on {url} after {max_attempts} attempts: {error}");
        Err(error)
    }

    /// Authenticated GET of `url`, decoded as JSON.
    pub async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let body = self.get(url, None).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Fetches model files from the platform's 3D file storage.
#[derive(Clone)]
pub struct CdfModelDataProvider {
    client: CdfClient,
}

impl CdfModelDataProvider {
    /// Create a provider fetching through `client`.
    pub fn new(client: CdfClient) -> Self {
        Self { client }
    }
}

impl BinaryFileProvider for CdfModelDataProvider {
    fn get_binary_file<'a>(
        &'a self,
        base_url: &'a str,
        file_name: &'a str,
        cancel: Option<&'a CancellationToken>,
    ) -> LocalBoxFuture<'a, Result<Vec<u8>>> {
        async move { self.client.get(&join_url(base_url, file_name), cancel).await }.boxed_local()
    }
}

impl JsonFileProvider for CdfModelDataProvider {
    fn get_json_file<'a>(
        &'a self,
        base_url: &'a str,
        file_name: &'a str,
    ) -> LocalBoxFuture<'a, Result<serde_json::Value>> {
        async move { self.client.get_json(&join_url(base_url, file_name)).await }.boxed_local()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RevisionResponse {
    #[serde(default)]
    rotation: Option<Vec3>,
    #[serde(default)]
    camera: Option<CameraConfiguration>,
}

/// Resolves platform model revisions.
#[derive(Clone)]
pub struct CdfModelMetadataProvider {
    client: CdfClient,
}

impl CdfModelMetadataProvider {
    /// Create a provider resolving models through `client`.
    pub fn new(client: CdfClient) -> Self {
        Self { client }
    }

    /// List the processed outputs of a model revision.
    pub async fn model_outputs(&self, model_id: u64, revision_id: u64) -> Result<ModelOutputList> {
        let url = format!(
            "{}/3d/models/{model_id}/revisions/{revision_id}/outputs",
            self.client.options().project_url()
        );
        let response: OutputsResponse = self.client.get_json(&url).await?;
        Ok(response.into())
    }

    async fn revision(&self, model: &ModelIdentifier) -> Result<RevisionResponse> {
        let (model_id, revision_id, _) = cdf_source(model)?;
        let url = format!(
            "{}/3d/models/{model_id}/revisions/{revision_id}",
            self.client.options().project_url()
        );
        self.client.get_json(&url).await
    }

    async fn resolve_uri(&self, model: &ModelIdentifier) -> Result<String> {
        let (model_id, revision_id, format) = cdf_source(model)?;
        let outputs = self.model_outputs(model_id, revision_id).await?;
        let output = outputs
            .find_most_recent(format)
            .ok_or_else(|| IoError::MissingOutput {
                format: format.to_string(),
                model: model.to_string(),
            })?;
        Ok(format!(
            "{}/3d/files/{}",
            self.client.options().project_url(),
            output.blob_id
        ))
    }
}

fn cdf_source(model: &ModelIdentifier) -> Result<(u64, u64, cadstream_core::ModelFormat)> {
    match model.source() {
        ModelSource::Cdf {
            model_id,
            revision_id,
            format,
        } => Ok((*model_id, *revision_id, *format)),
        ModelSource::Local { .. } => Err(IoError::UnsupportedSource(model.to_string())),
    }
}

impl ModelMetadataProvider for CdfModelMetadataProvider {
    fn model_uri<'a>(&'a self, model: &'a ModelIdentifier) -> LocalBoxFuture<'a, Result<String>> {
        self.resolve_uri(model).boxed_local()
    }

    fn model_matrix<'a>(&'a self, model: &'a ModelIdentifier) -> LocalBoxFuture<'a, Result<Mat4>> {
        async move {
            let revision = self.revision(model).await?;
            let rotation = revision
                .rotation
                .map(|r| Mat4::from_euler(EulerRot::XYZ, r.x, r.y, r.z))
                .unwrap_or(Mat4::IDENTITY);
            Ok(platform_to_viewer() * rotation)
        }
        .boxed_local()
    }

    fn model_camera<'a>(
        &'a self,
        model: &'a ModelIdentifier,
    ) -> LocalBoxFuture<'a, Result<Option<CameraConfiguration>>> {
        async move {
            let revision = self.revision(model).await?;
            Ok(revision
                .camera
                .map(|camera| camera.transformed(&platform_to_viewer())))
        }
        .boxed_local()
    }
}

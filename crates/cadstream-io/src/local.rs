//! Providers for models served as plain static files.

use std::rc::Rc;

use cadstream_core::{CancellationToken, ModelIdentifier, ModelSource};
use futures::future::{self, FutureExt, LocalBoxFuture};
use glam::Mat4;

use crate::error::{IoError, Result};
use crate::http::{HttpClient, HttpRequest};
use crate::metadata::{platform_to_viewer, CameraConfiguration, ModelMetadataProvider};
use crate::provider::{join_url, BinaryFileProvider, JsonFileProvider};

/// Fetches files with unauthenticated GET requests.
#[derive(Clone)]
pub struct LocalModelDataProvider {
    http: Rc<dyn HttpClient>,
}

impl LocalModelDataProvider {
    /// Create a provider fetching through `http`.
    pub fn new(http: Rc<dyn HttpClient>) -> Self {
        Self { http }
    }

    async fn fetch(&self, url: String, cancel: Option<&CancellationToken>) -> Result<Vec<u8>> {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(IoError::Cancelled);
        }
        let response = self.http.get(HttpRequest::get(url.clone())).await?;
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(IoError::Cancelled);
        }
        if !response.is_success() {
            return Err(IoError::http(response.status, url));
        }
        Ok(response.body)
    }
}

impl BinaryFileProvider for LocalModelDataProvider {
    fn get_binary_file<'a>(
        &'a self,
        base_url: &'a str,
        file_name: &'a str,
        cancel: Option<&'a CancellationToken>,
    ) -> LocalBoxFuture<'a, Result<Vec<u8>>> {
        self.fetch(join_url(base_url, file_name), cancel).boxed_local()
    }
}

impl JsonFileProvider for LocalModelDataProvider {
    fn get_json_file<'a>(
        &'a self,
        base_url: &'a str,
        file_name: &'a str,
    ) -> LocalBoxFuture<'a, Result<serde_json::Value>> {
        async move {
            let body = self.fetch(join_url(base_url, file_name), None).await?;
            Ok(serde_json::from_slice(&body)?)
        }
        .boxed_local()
    }
}

/// Resolves local models relative to a static file server root.
#[derive(Debug, Clone)]
pub struct LocalModelMetadataProvider {
    base_url: String,
}

impl LocalModelMetadataProvider {
    /// Create a provider serving models below `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn path<'a>(&self, model: &'a ModelIdentifier) -> Result<&'a str> {
        match model.source() {
            ModelSource::Local { path } => Ok(path),
            ModelSource::Cdf { .. } => Err(IoError::UnsupportedSource(model.to_string())),
        }
    }
}

impl ModelMetadataProvider for LocalModelMetadataProvider {
    fn model_uri<'a>(&'a self, model: &'a ModelIdentifier) -> LocalBoxFuture<'a, Result<String>> {
        let uri = self.path(model).map(|path| join_url(&self.base_url, path));
        future::ready(uri).boxed_local()
    }

    fn model_matrix<'a>(&'a self, model: &'a ModelIdentifier) -> LocalBoxFuture<'a, Result<Mat4>> {
        let matrix = self.path(model).map(|_| platform_to_viewer());
        future::ready(matrix).boxed_local()
    }

    fn model_camera<'a>(
        &'a self,
        model: &'a ModelIdentifier,
    ) -> LocalBoxFuture<'a, Result<Option<CameraConfiguration>>> {
        let camera = self.path(model).map(|_| None);
        future::ready(camera).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::ScriptedHttpClient;
    use crate::http::HttpResponse;
    use cadstream_core::ModelFormat;
    use futures::executor::block_on;

    fn provider(outcomes: Vec<Result<HttpResponse>>) -> (Rc<ScriptedHttpClient>, LocalModelDataProvider) {
        let http = Rc::new(ScriptedHttpClient::new(outcomes));
        (http.clone(), LocalModelDataProvider::new(http))
    }

    #[test]
    fn test_binary_file_bytes() {
        let (http, provider) = provider(vec![Ok(HttpResponse::new(200, "0123456789"))]);
        let bytes = block_on(provider.get_binary_file("http://localhost/model", "sector_3.glb", None)).unwrap();
        assert_eq!(bytes, vec![48, 49, 50, 51, 52, 53, 54, 55, 56, 57]);
        assert_eq!(http.requests.borrow()[0].url, "http://localhost/model/sector_3.glb");
        assert!(http.requests.borrow()[0].header("Authorization").is_none());
    }

    #[test]
    fn test_json_file() {
        let (_, provider) = provider(vec![Ok(HttpResponse::new(200, r#"{"version": 9}"#))]);
        let value = block_on(provider.get_json_file("http://localhost/model", "scene.json")).unwrap();
        assert_eq!(value["version"], 9);
    }

    #[test]
    fn test_no_retry_for_local_files() {
        let (http, provider) = provider(vec![
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::new(200, "late")),
        ]);
        let err = block_on(provider.get_binary_file("http://localhost", "a.glb", None)).unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(http.request_count(), 1);
    }

    #[test]
    fn test_cancelled_before_fetch() {
        let (http, provider) = provider(vec![Ok(HttpResponse::new(200, "x"))]);
        let token = CancellationToken::new();
        token.cancel();
        let err = block_on(provider.get_binary_file("http://localhost", "a.glb", Some(&token))).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(http.request_count(), 0);
    }

    #[test]
    fn test_metadata() {
        let provider = LocalModelMetadataProvider::new("http://localhost:8080/");
        let model = ModelIdentifier::local("primitives");
        assert_eq!(block_on(provider.model_uri(&model)).unwrap(), "http://localhost:8080/primitives");
        assert_eq!(block_on(provider.model_matrix(&model)).unwrap(), platform_to_viewer());
        assert_eq!(block_on(provider.model_camera(&model)).unwrap(), None);

        let remote = ModelIdentifier::cdf(1, 2, ModelFormat::RevealCadModel);
        assert!(matches!(
            block_on(provider.model_uri(&remote)),
            Err(IoError::UnsupportedSource(_))
        ));
    }
}

//! HTTP transport seam.

use futures::future::{FutureExt, LocalBoxFuture};

use crate::error::{IoError, Result};

/// A GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// GET request for `url` without headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add an `Authorization: Bearer` header.
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {token}"))
    }

    /// Value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Response with `status` and `body`.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Server errors and throttling are worth another attempt.
    pub fn is_transient(&self) -> bool {
        self.status >= 500 || self.status == 429
    }
}

/// Minimal HTTP client used by the providers.
///
/// Only transport failures are errors; any status code is a response.
pub trait HttpClient {
    fn get(&self, request: HttpRequest) -> LocalBoxFuture<'_, Result<HttpResponse>>;
}

/// [`HttpClient`] backed by `reqwest`.
///
/// Requests must be polled inside a Tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Client with reqwest's default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client reusing an existing reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpClient for ReqwestHttpClient {
    fn get(&self, request: HttpRequest) -> LocalBoxFuture<'_, Result<HttpResponse>> {
        async move {
            let mut builder = self.client.get(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            let response = builder
                .send()
                .await
                .map_err(|err| IoError::transport(format!("GET {}: {err}", request.url)))?;
            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .map_err(|err| IoError::transport(format!("reading {}: {err}", request.url)))?;
            Ok(HttpResponse {
                status,
                body: body.to_vec(),
            })
        }
        .boxed_local()
    }
}

//! cadstream-io: fetching model data.
//!
//! Two families of providers live here:
//!
//! - data providers fetch sector files and JSON documents relative to a
//!   model's base URL ([`BinaryFileProvider`], [`JsonFileProvider`])
//! - metadata providers resolve a [`ModelIdentifier`] to that base URL, a
//!   model transform and an optional default camera ([`ModelMetadataProvider`])
//!
//! Both come in a local flavor, reading from a static file server, and a
//! cloud flavor that authenticates, retries transient failures and
//! reauthenticates on `401`.
//!
//! All futures are `!Send`; the providers are meant to be driven from one
//! cooperative executor.
//!
//! [`ModelIdentifier`]: cadstream_core::ModelIdentifier

pub mod auth;
pub mod cdf;
pub mod error;
pub mod http;
pub mod local;
pub mod metadata;
pub mod options;
pub mod outputs;
pub mod provider;

pub use auth::{StaticTokenProvider, TokenProvider};
pub use cdf::{CdfClient, CdfModelDataProvider, CdfModelMetadataProvider};
pub use error::{IoError, Result};
pub use http::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use local::{LocalModelDataProvider, LocalModelMetadataProvider};
pub use metadata::{platform_to_viewer, CameraConfiguration, ModelMetadataProvider};
pub use options::CdfClientOptions;
pub use outputs::{ModelOutput, ModelOutputList};
pub use provider::{join_url, BinaryFileProvider, JsonFileProvider, ModelDataProvider};

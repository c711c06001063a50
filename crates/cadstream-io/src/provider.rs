//! Data provider traits.

use cadstream_core::CancellationToken;
use futures::future::LocalBoxFuture;

use crate::error::Result;

/// Fetches raw bytes of a file stored next to a model.
pub trait BinaryFileProvider {
    fn get_binary_file<'a>(
        &'a self,
        base_url: &'a str,
        file_name: &'a str,
        cancel: Option<&'a CancellationToken>,
    ) -> LocalBoxFuture<'a, Result<Vec<u8>>>;
}

/// Fetches and decodes a JSON file stored next to a model.
pub trait JsonFileProvider {
    fn get_json_file<'a>(
        &'a self,
        base_url: &'a str,
        file_name: &'a str,
    ) -> LocalBoxFuture<'a, Result<serde_json::Value>>;
}

/// A provider of both binary and JSON files.
pub trait ModelDataProvider: BinaryFileProvider + JsonFileProvider {}

impl<T: BinaryFileProvider + JsonFileProvider + ?Sized> ModelDataProvider for T {}

/// Join a base URL and a relative file name with exactly one slash.
pub fn join_url(base_url: &str, file_name: &str) -> String {
    if base_url.is_empty() {
        return file_name.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        file_name.trim_start_matches('/')
    )
}

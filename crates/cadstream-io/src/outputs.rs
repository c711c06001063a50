//! Model revision outputs.
//!
//! A model revision is processed into one or more outputs, one per format
//! and format version. Each output is stored as a directory blob.

use cadstream_core::ModelFormat;
use serde::{Deserialize, Serialize};

/// One processed output of a model revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOutput {
    pub format: String,
    pub version: u32,
    pub blob_id: u64,
}

/// Outputs of a model revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOutputList {
    pub outputs: Vec<ModelOutput>,
}

/// Wire shape of the outputs endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct OutputsResponse {
    #[serde(default)]
    pub(crate) items: Vec<ModelOutput>,
}

impl From<OutputsResponse> for ModelOutputList {
    fn from(response: OutputsResponse) -> Self {
        Self {
            outputs: response.items,
        }
    }
}

impl ModelOutputList {
    /// Output of `format` with the highest version.
    pub fn find_most_recent(&self, format: ModelFormat) -> Option<&ModelOutput> {
        self.outputs
            .iter()
            .filter(|o| o.format == format.as_str())
            .max_by_key(|o| o.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_recent() {
        let response: OutputsResponse = serde_json::from_str(
            r#"{"items": [
                {"format": "reveal-directory", "version": 8, "blobId": 1},
                {"format": "reveal-directory", "version": 9, "blobId": 2},
                {"format": "ept-pointcloud", "version": 1, "blobId": 3}
            ]}"#,
        )
        .unwrap();
        let outputs = ModelOutputList::from(response);
        assert_eq!(outputs.find_most_recent(ModelFormat::RevealCadModel).unwrap().blob_id, 2);
        assert_eq!(outputs.find_most_recent(ModelFormat::EptPointCloud).unwrap().blob_id, 3);
        assert!(outputs.find_most_recent(ModelFormat::GltfCadModel).is_none());
    }
}

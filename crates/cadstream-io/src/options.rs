//! Client configuration.

use serde::{Deserialize, Serialize};

/// Default number of attempts per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Options for the cloud platform providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CdfClientOptions {
    /// API root, e.g. `https://api.cognitedata.com`.
    pub base_url: String,
    /// Project the models belong to.
    pub project: String,
    /// Attempts per request, including the first.
    pub max_attempts: u32,
}

impl Default for CdfClientOptions {
    fn default() -> Self {
        Self {
            base_url: "https://api.cognitedata.com".to_string(),
            project: String::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl CdfClientOptions {
    /// Options for `project` on the cluster at `base_url`.
    pub fn new(base_url: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            project: project.into(),
            ..Default::default()
        }
    }

    /// Set how many times a request is attempted.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// `{base_url}/api/v1/projects/{project}`
    pub fn project_url(&self) -> String {
        format!(
            "{}/api/v1/projects/{}",
            self.base_url.trim_end_matches('/'),
            self.project
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CdfClientOptions::default();
        assert_eq!(options.max_attempts, 3);
        assert_eq!(
            CdfClientOptions::new("https://host/", "proj").project_url(),
            "https://host/api/v1/projects/proj"
        );
    }

    #[test]
    fn test_attempts_never_zero() {
        assert_eq!(CdfClientOptions::default().with_max_attempts(0).max_attempts, 1);
    }

    #[test]
    fn test_partial_json() {
        let options: CdfClientOptions = serde_json::from_str(r#"{"project": "p"}"#).unwrap();
        assert_eq!(options.project, "p");
        assert_eq!(options.max_attempts, DEFAULT_MAX_ATTEMPTS);
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["maxAttempts"], 3);
    }
}

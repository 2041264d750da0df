use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traits::features::FeatureSchema;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for serving and registry polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServingConfig {
    /// Experiment/track to poll for candidate versions
    pub track_name: String,
    /// Seconds between adoption checks
    pub poll_interval_sec: u64,
    /// Input fields, in the order the transform was fitted on
    pub feature_schema: FeatureSchema,
    /// Root of the file-backed registry (`<dir>/<track>/runs.json`)
    pub registry_dir: Option<PathBuf>,
    /// Root of the file-backed artifacts (`<dir>/<version>/bundle.json`)
    pub artifact_dir: Option<PathBuf>,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            track_name: "Churn predictions".to_string(),
            poll_interval_sec: 30,
            feature_schema: FeatureSchema::churn(),
            registry_dir: None,
            artifact_dir: None,
        }
    }
}

impl ServingConfig {
    /// Create a new configuration with custom values
    pub fn new(track_name: &str, poll_interval_sec: u64, feature_schema: FeatureSchema) -> Self {
        Self {
            track_name: track_name.to_string(),
            poll_interval_sec,
            feature_schema,
            ..Default::default()
        }
    }

    /// Parse and validate a JSON document; absent keys take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_sec)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.track_name.trim().is_empty() {
            return Err(ConfigError::Invalid("track_name must not be empty".to_string()));
        }
        if self.poll_interval_sec == 0 {
            return Err(ConfigError::Invalid("poll_interval_sec must be positive".to_string()));
        }
        if self.feature_schema.is_empty() {
            return Err(ConfigError::Invalid("feature_schema must not be empty".to_string()));
        }
        if let Some(name) = self.feature_schema.duplicate() {
            return Err(ConfigError::Invalid(format!("feature_schema lists {} twice", name)));
        }
        Ok(())
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::bundle::ModelBundle;

/// Opaque identifier of a recorded model version (a tracking-store run id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelVersionId(String);

impl ModelVersionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelVersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelVersionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Higher is better.
pub type QualityScore = f64;

/// One candidate as listed by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version_id: ModelVersionId,
    pub quality_score: QualityScore,
    /// Milliseconds since the Unix epoch
    pub recorded_at: u64,
}

impl VersionRecord {
    pub fn new(version_id: impl Into<String>, quality_score: QualityScore, recorded_at: u64) -> Self {
        Self {
            version_id: ModelVersionId::new(version_id),
            quality_score,
            recorded_at,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),
    #[error("Track not found: {0}")]
    TrackNotFound(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArtifactError {
    #[error("Artifact not found for version {0}")]
    ArtifactNotFound(ModelVersionId),
    #[error("Load error: {0}")]
    LoadError(String),
}

/// Experiment-tracking store listing candidate versions with their scores
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    async fn list_versions(&self, track_name: &str) -> Result<Vec<VersionRecord>, RegistryError>;
}

/// Materializes a runnable bundle for a version
#[async_trait::async_trait]
pub trait ArtifactLoader: Send + Sync {
    async fn load(&self, version_id: &ModelVersionId) -> Result<ModelBundle, ArtifactError>;
}

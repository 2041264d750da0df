//! Directory-backed collaborators.
//!
//! Layout:
//! ```text
//! <registry_dir>/<track>/runs.json       [{"version_id", "quality_score", "recorded_at"}, ...]
//! <artifact_dir>/<version>/bundle.json   BundleManifest
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::bundle::ModelBundle;
use crate::models::logistic::LogisticRegression;
use crate::models::scaler::StandardScaler;
use crate::traits::model::ModelError;
use crate::traits::registry::{
    ArtifactError, ArtifactLoader, ModelVersionId, QualityScore, Registry, RegistryError,
    VersionRecord,
};

const RUNS_FILE: &str = "runs.json";
const BUNDLE_FILE: &str = "bundle.json";

/// Rejects names that would escape the root directory
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

/// Registry reading one `runs.json` per track directory
#[derive(Debug, Clone)]
pub struct FileRegistry {
    root: PathBuf,
}

impl FileRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn runs_path(&self, track_name: &str) -> PathBuf {
        self.root.join(track_name).join(RUNS_FILE)
    }
}

#[async_trait::async_trait]
impl Registry for FileRegistry {
    async fn list_versions(&self, track_name: &str) -> Result<Vec<VersionRecord>, RegistryError> {
        if !is_plain_name(track_name) {
            return Err(RegistryError::TrackNotFound(track_name.to_string()));
        }

        match tokio::fs::metadata(self.root.join(track_name)).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(RegistryError::TrackNotFound(track_name.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RegistryError::TrackNotFound(track_name.to_string()))
            }
            Err(e) => return Err(RegistryError::RegistryUnavailable(e.to_string())),
        }

        let path = self.runs_path(track_name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            // Track exists but nothing has been recorded yet
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RegistryError::RegistryUnavailable(format!("{}: {}", path.display(), e))),
        };

        let versions: Vec<VersionRecord> = serde_json::from_slice(&bytes)
            .map_err(|e| RegistryError::RegistryUnavailable(format!("{}: {}", path.display(), e)))?;
        debug!(track = track_name, count = versions.len(), "listed registry versions");
        Ok(versions)
    }
}

/// On-disk form of a bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    pub quality_score: QualityScore,
    pub transform: StandardScaler,
    pub predictor: LogisticRegression,
}

impl BundleManifest {
    /// Validate parameters and assemble the runnable bundle
    pub fn into_bundle(self, version_id: ModelVersionId) -> Result<ModelBundle, ModelError> {
        self.transform.check()?;
        self.predictor.check()?;
        ModelBundle::new(
            version_id,
            self.quality_score,
            Arc::new(self.transform),
            Arc::new(self.predictor),
        )
    }

    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)
    }
}

/// Loads `bundle.json` manifests from one directory per version
#[derive(Debug, Clone)]
pub struct JsonArtifactLoader {
    root: PathBuf,
}

impl JsonArtifactLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn bundle_path(&self, version_id: &ModelVersionId) -> PathBuf {
        self.root.join(version_id.as_str()).join(BUNDLE_FILE)
    }
}

#[async_trait::async_trait]
impl ArtifactLoader for JsonArtifactLoader {
    async fn load(&self, version_id: &ModelVersionId) -> Result<ModelBundle, ArtifactError> {
        if !is_plain_name(version_id.as_str()) {
            return Err(ArtifactError::ArtifactNotFound(version_id.clone()));
        }

        let path = self.bundle_path(version_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ArtifactError::ArtifactNotFound(version_id.clone()))
            }
            Err(e) => return Err(ArtifactError::LoadError(format!("{}: {}", path.display(), e))),
        };

        let manifest: BundleManifest = serde_json::from_slice(&bytes)
            .map_err(|e| ArtifactError::LoadError(format!("{}: {}", path.display(), e)))?;
        manifest
            .into_bundle(version_id.clone())
            .map_err(|e| ArtifactError::LoadError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::features::{FeatureRecord, FeatureSchema};
    use crate::traits::model::Label;

    fn manifest(score: f64) -> BundleManifest {
        BundleManifest {
            quality_score: score,
            transform: StandardScaler::new(FeatureSchema::new(["tenure"]), vec![10.0], vec![5.0]).unwrap(),
            predictor: LogisticRegression::new(vec![-2.0], 0.0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_file_registry_lists_runs() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FileRegistry::new(dir.path());

        assert_eq!(
            registry.list_versions("churn").await,
            Err(RegistryError::TrackNotFound("churn".to_string()))
        );

        std::fs::create_dir(dir.path().join("churn")).unwrap();
        assert!(registry.list_versions("churn").await.unwrap().is_empty());

        let runs = vec![VersionRecord::new("a1", 0.8, 100), VersionRecord::new("b2", 0.75, 200)];
        std::fs::write(registry.runs_path("churn"), serde_json::to_vec(&runs).unwrap()).unwrap();
        assert_eq!(registry.list_versions("churn").await.unwrap(), runs);
    }

    #[tokio::test]
    async fn test_file_registry_malformed_runs() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FileRegistry::new(dir.path());
        std::fs::create_dir(dir.path().join("churn")).unwrap();
        std::fs::write(registry.runs_path("churn"), b"[{\"version_id\": 3}]").unwrap();

        assert!(matches!(
            registry.list_versions("churn").await,
            Err(RegistryError::RegistryUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_file_registry_rejects_path_escape() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FileRegistry::new(dir.path());
        assert!(matches!(
            registry.list_versions("../etc").await,
            Err(RegistryError::TrackNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_json_loader_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let loader = JsonArtifactLoader::new(dir.path());
        let version = ModelVersionId::new("a1");

        std::fs::create_dir(dir.path().join("a1")).unwrap();
        manifest(0.8).save(loader.bundle_path(&version)).unwrap();

        let bundle = loader.load(&version).await.unwrap();
        assert_eq!(bundle.version_id(), &version);
        assert_eq!(bundle.quality_score(), 0.8);

        // Short tenure scales negative, negative weight pushes it positive
        let record = FeatureRecord::new().with("tenure", 2);
        assert_eq!(bundle.evaluate(&record).unwrap(), Label::Positive);
        let record = FeatureRecord::new().with("tenure", 40);
        assert_eq!(bundle.evaluate(&record).unwrap(), Label::Negative);
    }

    #[tokio::test]
    async fn test_json_loader_errors() {
        let dir = tempfile::tempdir().unwrap();
        let loader = JsonArtifactLoader::new(dir.path());

        let missing = ModelVersionId::new("nope");
        assert_eq!(
            loader.load(&missing).await.unwrap_err(),
            ArtifactError::ArtifactNotFound(missing.clone())
        );

        let broken = ModelVersionId::new("broken");
        std::fs::create_dir(dir.path().join("broken")).unwrap();
        std::fs::write(loader.bundle_path(&broken), b"not json").unwrap();
        assert!(matches!(loader.load(&broken).await, Err(ArtifactError::LoadError(_))));

        // Parameters that deserialize but do not fit together
        let mismatched = ModelVersionId::new("mismatched");
        std::fs::create_dir(dir.path().join("mismatched")).unwrap();
        let mut bad = manifest(0.9);
        bad.predictor = LogisticRegression::new(vec![1.0, 1.0], 0.0).unwrap();
        bad.save(loader.bundle_path(&mismatched)).unwrap();
        assert!(matches!(loader.load(&mismatched).await, Err(ArtifactError::LoadError(msg)) if msg.contains("Dimension mismatch")));
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::models::bundle::ModelBundle;
use crate::traits::registry::{
    ArtifactError, ArtifactLoader, ModelVersionId, Registry, RegistryError, VersionRecord,
};

/// Registry backed by an in-process table, with failure injection
#[derive(Debug, Default)]
pub struct StaticRegistry {
    tracks: Mutex<HashMap<String, Vec<VersionRecord>>>,
    failure: Mutex<Option<RegistryError>>,
    calls: AtomicUsize,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the listed versions of a track (creating it if needed)
    pub fn set_versions(&self, track_name: &str, versions: Vec<VersionRecord>) {
        self.tracks.lock().insert(track_name.to_string(), versions);
    }

    pub fn push_version(&self, track_name: &str, version: VersionRecord) {
        self.tracks
            .lock()
            .entry(track_name.to_string())
            .or_default()
            .push(version);
    }

    /// Fail every listing with `error` until cleared with `None`
    pub fn fail_with(&self, error: Option<RegistryError>) {
        *self.failure.lock() = error;
    }

    /// Number of listings requested so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Registry for StaticRegistry {
    async fn list_versions(&self, track_name: &str) -> Result<Vec<VersionRecord>, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }

        self.tracks
            .lock()
            .get(track_name)
            .cloned()
            .ok_or_else(|| RegistryError::TrackNotFound(track_name.to_string()))
    }
}

/// Artifact loader serving prebuilt bundles from memory
#[derive(Debug, Default)]
pub struct InMemoryArtifactLoader {
    bundles: Mutex<HashMap<ModelVersionId, ModelBundle>>,
    failures: Mutex<HashMap<ModelVersionId, ArtifactError>>,
    loads: AtomicUsize,
}

impl InMemoryArtifactLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bundle: ModelBundle) {
        self.bundles.lock().insert(bundle.version_id().clone(), bundle);
    }

    /// Make loads of `version_id` fail with `error`
    pub fn fail(&self, version_id: &ModelVersionId, error: ArtifactError) {
        self.failures.lock().insert(version_id.clone(), error);
    }

    pub fn clear_failure(&self, version_id: &ModelVersionId) {
        self.failures.lock().remove(version_id);
    }

    /// Number of load attempts so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ArtifactLoader for InMemoryArtifactLoader {
    async fn load(&self, version_id: &ModelVersionId) -> Result<ModelBundle, ArtifactError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().get(version_id) {
            return Err(err.clone());
        }

        self.bundles
            .lock()
            .get(version_id)
            .cloned()
            .ok_or_else(|| ArtifactError::ArtifactNotFound(version_id.clone()))
    }
}

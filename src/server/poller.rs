use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::server::config::ServingConfig;
use crate::server::metrics::ServingStats;
use crate::server::model_server::BundleHolder;
use crate::traits::features::FeatureSchema;
use crate::traits::registry::{
    ArtifactError, ArtifactLoader, ModelVersionId, Registry, RegistryError, VersionRecord,
};

/// What a single poll did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The candidate was loaded and put into service
    Adopted(ModelVersionId),
    /// The track has no recorded versions
    NoCandidates,
    /// Several versions share the top score and recording time
    Ambiguous,
    /// The best candidate does not beat the bundle in service
    NotBetter(ModelVersionId),
    RegistryFailed(RegistryError),
    LoadFailed(ModelVersionId, ArtifactError),
    /// The loaded transform expects different inputs than configured
    SchemaMismatch(ModelVersionId),
    /// A concurrent publish adopted something at least as good first
    Superseded(ModelVersionId),
}

/// Result of ranking a registry listing
#[derive(Debug, PartialEq)]
pub enum Selection<'a> {
    Best(&'a VersionRecord),
    Ambiguous,
    Empty,
}

/// Pick the highest-scoring version, breaking score ties by latest `recorded_at`.
///
/// Non-finite scores are ignored. If the tie survives recency, nothing is selected.
pub fn select_candidate(versions: &[VersionRecord]) -> Selection<'_> {
    let scored = versions.iter().filter(|v| v.quality_score.is_finite());

    let Some(top) = scored.clone().map(|v| v.quality_score).reduce(f64::max) else {
        return Selection::Empty;
    };

    let tied: Vec<&VersionRecord> = scored.filter(|v| v.quality_score == top).collect();
    let latest = tied.iter().map(|v| v.recorded_at).max().unwrap_or_default();
    let mut newest = tied.into_iter().filter(|v| v.recorded_at == latest);

    let Some(first) = newest.next() else {
        return Selection::Empty;
    };
    if newest.all(|v| v.version_id == first.version_id) {
        Selection::Best(first)
    } else {
        Selection::Ambiguous
    }
}

/// Periodically adopts better bundles from the registry into a [`BundleHolder`]
pub struct RegistryPoller {
    registry: Arc<dyn Registry>,
    loader: Arc<dyn ArtifactLoader>,
    holder: Arc<BundleHolder>,
    track_name: String,
    schema: FeatureSchema,
    stats: Arc<ServingStats>,
}

impl RegistryPoller {
    pub fn new(
        registry: Arc<dyn Registry>,
        loader: Arc<dyn ArtifactLoader>,
        holder: Arc<BundleHolder>,
        config: &ServingConfig,
        stats: Arc<ServingStats>,
    ) -> Self {
        Self {
            registry,
            loader,
            holder,
            track_name: config.track_name.clone(),
            schema: config.feature_schema.clone(),
            stats,
        }
    }

    pub fn track_name(&self) -> &str {
        &self.track_name
    }

    /// Run one query/evaluate/load/publish cycle.
    ///
    /// Every failure is contained here; the holder is only touched by a
    /// successful publish.
    pub async fn tick(&self) -> TickOutcome {
        self.stats.poll_count.fetch_add(1, Ordering::SeqCst);

        let versions = match self.registry.list_versions(&self.track_name).await {
            Ok(versions) => versions,
            Err(err) => {
                self.stats.poll_failures.fetch_add(1, Ordering::SeqCst);
                warn!(track = %self.track_name, error = %err, "registry query failed");
                return TickOutcome::RegistryFailed(err);
            }
        };

        let candidate = match select_candidate(&versions) {
            Selection::Best(candidate) => candidate,
            Selection::Empty => {
                info!(track = %self.track_name, "no recorded versions");
                return TickOutcome::NoCandidates;
            }
            Selection::Ambiguous => {
                warn!(track = %self.track_name, "top score tied with no most recent version, skipping");
                return TickOutcome::Ambiguous;
            }
        };

        if !self.holder.would_adopt(&candidate.version_id, candidate.quality_score) {
            debug!(
                version = %candidate.version_id,
                score = candidate.quality_score,
                best = self.holder.best_score(),
                "no new model found, keeping current model"
            );
            return TickOutcome::NotBetter(candidate.version_id.clone());
        }

        info!(
            version = %candidate.version_id,
            previous = self.holder.best_score(),
            score = candidate.quality_score,
            "new model detected, loading"
        );
        let bundle = match self.loader.load(&candidate.version_id).await {
            Ok(bundle) => bundle,
            Err(err) => {
                self.stats.load_failures.fetch_add(1, Ordering::SeqCst);
                warn!(version = %candidate.version_id, error = %err, "failed to load model, keeping current model");
                return TickOutcome::LoadFailed(candidate.version_id.clone(), err);
            }
        };

        if bundle.schema() != &self.schema {
            self.stats.load_failures.fetch_add(1, Ordering::SeqCst);
            warn!(
                version = %candidate.version_id,
                expected = %self.schema,
                found = %bundle.schema(),
                "model expects different features, keeping current model"
            );
            return TickOutcome::SchemaMismatch(candidate.version_id.clone());
        }

        // The registry's score is authoritative for ranking and display
        if bundle.quality_score() != candidate.quality_score {
            debug!(
                version = %candidate.version_id,
                artifact_score = bundle.quality_score(),
                registry_score = candidate.quality_score,
                "artifact score differs from registry, using registry score"
            );
        }
        let bundle = bundle.with_score(candidate.quality_score);

        let version_id = bundle.version_id().clone();
        if self.holder.publish(bundle) {
            self.stats.record_adoption();
            info!(version = %version_id, score = self.holder.best_score(), "model adopted");
            TickOutcome::Adopted(version_id)
        } else {
            info!(version = %version_id, "model superseded before publish");
            TickOutcome::Superseded(version_id)
        }
    }

    /// Run `tick` every `period` until `shutdown` flips to true or its sender drops.
    ///
    /// The first tick fires one period after spawning. A tick in progress
    /// finishes before shutdown is observed.
    pub fn spawn(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            // interval() panics on a zero period
            let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Skip the immediate first tick
            ticker.tick().await;

            loop {
                if *shutdown.borrow() {
                    break;
                }

                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        self.tick().await;
                    }
                }
            }

            info!(track = %self.track_name, "registry poller stopped");
        })
    }
}

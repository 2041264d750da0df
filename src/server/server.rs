use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::server::config::ServingConfig;
use crate::server::metrics::ServingStats;
use crate::server::model_server::BundleHolder;
use crate::server::poller::{RegistryPoller, TickOutcome};
use crate::traits::features::FeatureRecord;
use crate::traits::model::{Label, ModelError};
use crate::traits::registry::{ArtifactLoader, ModelVersionId, QualityScore, Registry};

/// Errors returned to prediction callers
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Nothing has been loaded yet
    #[error("Model not ready")]
    ModelUnavailable,
    /// Missing, malformed or unexpected request field
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Model error: {0}")]
    Model(#[source] ModelError),
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidFeature(field) => ServiceError::InvalidInput(field),
            other => ServiceError::Model(other),
        }
    }
}

/// A label together with the bundle that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: Label,
    pub version_id: ModelVersionId,
    pub quality_score: QualityScore,
}

/// Serves predictions from the active bundle while a poller upgrades it
pub struct PredictionServer {
    holder: Arc<BundleHolder>,
    poller: Arc<RegistryPoller>,
    config: ServingConfig,
    stats: Arc<ServingStats>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PredictionServer {
    /// Create a server with an empty holder
    pub fn new(config: ServingConfig, registry: Arc<dyn Registry>, loader: Arc<dyn ArtifactLoader>) -> Self {
        Self::with_holder(config, registry, loader, Arc::new(BundleHolder::new()))
    }

    /// Create a server around an existing holder
    pub fn with_holder(
        config: ServingConfig,
        registry: Arc<dyn Registry>,
        loader: Arc<dyn ArtifactLoader>,
        holder: Arc<BundleHolder>,
    ) -> Self {
        let stats = Arc::new(ServingStats::new());
        let poller = Arc::new(RegistryPoller::new(
            registry,
            loader,
            Arc::clone(&holder),
            &config,
            Arc::clone(&stats),
        ));
        let (shutdown, _) = watch::channel(false);

        Self {
            holder,
            poller,
            config,
            stats,
            shutdown,
            task: Mutex::new(None),
        }
    }

    /// Load synchronously once, then start background polling.
    ///
    /// A failed first load is not fatal: requests get `ModelUnavailable` until
    /// a later poll succeeds.
    pub async fn initialize(&self) -> TickOutcome {
        let outcome = self.poller.tick().await;
        info!(track = %self.config.track_name, ?outcome, "initial model load");
        self.start_polling();
        outcome
    }

    /// Start the background poller if it is not already running
    pub fn start_polling(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        self.shutdown.send_replace(false);
        let handle = Arc::clone(&self.poller).spawn(self.config.poll_interval(), self.shutdown.subscribe());
        *task = Some(handle);
        info!(
            track = %self.config.track_name,
            interval_sec = self.config.poll_interval_sec,
            "registry poller started"
        );
    }

    /// Stop background polling and wait for the poller to exit.
    ///
    /// The active bundle stays in service.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    pub fn is_polling(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Classify one record against a single snapshot of the active bundle
    pub fn predict(&self, record: &FeatureRecord) -> Result<PredictionResult, ServiceError> {
        let start_time = Instant::now();

        let Some(bundle) = self.holder.snapshot() else {
            self.stats.unavailable_count.fetch_add(1, Ordering::SeqCst);
            return Err(ServiceError::ModelUnavailable);
        };

        match bundle.evaluate(record) {
            Ok(label) => {
                self.stats.prediction_count.fetch_add(1, Ordering::SeqCst);
                let duration = start_time.elapsed().as_micros() as usize;
                self.stats.latest_prediction_latency_us.store(duration, Ordering::SeqCst);

                Ok(PredictionResult {
                    label,
                    version_id: bundle.version_id().clone(),
                    quality_score: bundle.quality_score(),
                })
            }
            Err(err) => {
                self.stats.prediction_errors.fetch_add(1, Ordering::SeqCst);
                Err(err.into())
            }
        }
    }

    /// Score of the bundle in service, 0.0 before the first load
    pub fn current_accuracy(&self) -> QualityScore {
        self.holder
            .snapshot()
            .map_or(0.0, |bundle| bundle.quality_score())
    }

    pub fn current_version(&self) -> Option<ModelVersionId> {
        self.holder.best_version()
    }

    /// Run one poll now, outside the schedule
    pub async fn poll_now(&self) -> TickOutcome {
        self.poller.tick().await
    }

    pub fn holder(&self) -> Arc<BundleHolder> {
        Arc::clone(&self.holder)
    }

    pub fn stats(&self) -> Arc<ServingStats> {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &ServingConfig {
        &self.config
    }
}

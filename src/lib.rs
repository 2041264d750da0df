//! Hotswap: prediction serving with zero-downtime model upgrades
//!
//! A [`PredictionServer`] answers requests from the bundle held in a
//! [`BundleHolder`] while a [`RegistryPoller`] watches an experiment registry
//! and swaps in better-scoring bundles as they are recorded.

pub mod traits;
pub mod models;
pub mod registry;
pub mod server;


// Re-export key types for ergonomic use
pub use traits::features::{FeatureRecord, FeatureSchema, FeatureVector, FieldValue};
pub use traits::model::{Label, ModelError, Predictor, Transform};
pub use traits::registry::{
    ArtifactError, ArtifactLoader, ModelVersionId, QualityScore, Registry, RegistryError,
    VersionRecord,
};
pub use models::bundle::ModelBundle;
pub use models::logistic::LogisticRegression;
pub use models::scaler::StandardScaler;
pub use registry::file::{BundleManifest, FileRegistry, JsonArtifactLoader};
pub use registry::memory::{InMemoryArtifactLoader, StaticRegistry};
pub use server::config::{ConfigError, ServingConfig};
pub use server::metrics::ServingStats;
pub use server::model_server::BundleHolder;
pub use server::poller::{RegistryPoller, TickOutcome};
pub use server::server::{PredictionResult, PredictionServer, ServiceError};

// Re-export API structures for ease of use
pub use server::api::{
    ApiError,
    ApiResult,
    ModelInfo,
    PredictionResponse,
    PredictionStatus,
    ServingApi,
};

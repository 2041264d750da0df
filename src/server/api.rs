use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::server::server::{PredictionServer, ServiceError};
use crate::traits::features::{FeatureRecord, FieldValue};

/// API errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Malformed request: {0}")]
    MalformedRequest(#[from] serde_json::Error),
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Ok,
    /// No model loaded yet
    Unavailable,
    /// The request itself was rejected
    Invalid,
    Error,
}

/// Prediction response
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub status: PredictionStatus,
    /// "Yes" when churn is predicted, "No" otherwise
    pub prediction: Option<String>,
    pub model_version: Option<String>,
    pub model_accuracy: f64,
    pub error: Option<String>,
}

/// Model information response
#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub track_name: String,
    pub version: Option<String>,
    pub accuracy: f64,
    pub generation: usize,
    pub polling: bool,
    pub stats: String,
}

/// Transport-facing facade over a [`PredictionServer`]
#[derive(Clone)]
pub struct ServingApi {
    server: Arc<PredictionServer>,
}

impl ServingApi {
    pub fn new(server: Arc<PredictionServer>) -> Self {
        Self { server }
    }

    pub fn server(&self) -> &Arc<PredictionServer> {
        &self.server
    }

    /// Make a prediction; failures are reported in the response status
    pub fn predict(&self, record: &FeatureRecord) -> PredictionResponse {
        let model_accuracy = self.server.current_accuracy();
        match self.server.predict(record) {
            Ok(result) => PredictionResponse {
                status: PredictionStatus::Ok,
                prediction: Some(result.label.as_answer().to_string()),
                model_version: Some(result.version_id.to_string()),
                model_accuracy: result.quality_score,
                error: None,
            },
            Err(err) => {
                let status = match err {
                    ServiceError::ModelUnavailable => PredictionStatus::Unavailable,
                    ServiceError::InvalidInput(_) => PredictionStatus::Invalid,
                    ServiceError::Model(_) => PredictionStatus::Error,
                };
                PredictionResponse {
                    status,
                    prediction: None,
                    model_version: self.server.current_version().map(|v| v.to_string()),
                    model_accuracy,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Predict from submitted form fields (all values arrive as text)
    pub fn predict_form(&self, form: &HashMap<String, String>) -> PredictionResponse {
        let record: FeatureRecord = form
            .iter()
            .map(|(name, value)| (name.clone(), FieldValue::Text(value.clone())))
            .collect();
        self.predict(&record)
    }

    /// Predict from a JSON object of field values.
    ///
    /// Only a body that is not a JSON object is a `MalformedRequest`; a field
    /// value that cannot be coerced is reported by name in the response.
    pub fn predict_json(&self, body: &str) -> ApiResult<PredictionResponse> {
        let record: FeatureRecord = serde_json::from_str(body)?;
        Ok(self.predict(&record))
    }

    /// Get model information
    pub fn model_info(&self) -> ModelInfo {
        let holder = self.server.holder();
        ModelInfo {
            track_name: self.server.config().track_name.clone(),
            version: holder.best_version().map(|v| v.to_string()),
            accuracy: self.server.current_accuracy(),
            generation: holder.generation(),
            polling: self.server.is_polling(),
            stats: self.server.stats().format_stats(),
        }
    }
}

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traits::features::{FeatureSchema, FeatureVector};

/// Errors raised by transforms, predictors and bundle construction
#[derive(Error, Debug)]
pub enum ModelError {
    /// A request field is missing, malformed or not part of the schema
    #[error("Invalid feature: {0}")]
    InvalidFeature(String),
    /// Data dimension mismatch errors
    #[error("Dimension mismatch ({context}): expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        context: String,
    },
    /// Invalid parameter errors
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Errors during prediction
    #[error("Prediction error: {0}")]
    PredictionError(String),
}

/// Binary output of a predictor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Positive,
    Negative,
}

impl Label {
    /// Form-facing rendering ("Yes" for a positive prediction)
    pub fn as_answer(&self) -> &'static str {
        match self {
            Label::Positive => "Yes",
            Label::Negative => "No",
        }
    }
}

/// Maps encoded raw inputs to the numeric vector the predictor was trained on.
///
/// Implementations are fitted once and must be deterministic.
pub trait Transform: Send + Sync + Debug {
    /// Ordered input fields this transform expects
    fn schema(&self) -> &FeatureSchema;

    /// Length of the produced vector
    fn output_dimension(&self) -> usize;

    fn transform(&self, input: &FeatureVector) -> Result<FeatureVector, ModelError>;
}

/// Maps a transformed vector to a binary label.
pub trait Predictor: Send + Sync + Debug {
    /// Length of the vector this predictor accepts
    fn input_dimension(&self) -> usize;

    fn predict(&self, features: &FeatureVector) -> Result<Label, ModelError>;
}

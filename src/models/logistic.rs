use serde::{Deserialize, Serialize};

use crate::traits::features::FeatureVector;
use crate::traits::model::{Label, ModelError, Predictor};

/// Logistic regression binary classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// One coefficient per input feature
    weights: Vec<f32>,
    /// Bias term
    intercept: f32,
    /// Probability at or above which the label is positive
    #[serde(default = "default_threshold")]
    threshold: f32,
}

fn default_threshold() -> f32 {
    0.5
}

impl LogisticRegression {
    /// Create a classifier from fitted coefficients
    pub fn new(weights: Vec<f32>, intercept: f32) -> Result<Self, ModelError> {
        Self::with_threshold(weights, intercept, default_threshold())
    }

    pub fn with_threshold(weights: Vec<f32>, intercept: f32, threshold: f32) -> Result<Self, ModelError> {
        let model = Self { weights, intercept, threshold };
        model.check()?;
        Ok(model)
    }

    pub fn check(&self) -> Result<(), ModelError> {
        if self.weights.is_empty() {
            return Err(ModelError::InvalidParameter("Empty weights".to_string()));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ModelError::InvalidParameter(format!(
                "Threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Probability of the positive class
    pub fn probability(&self, features: &FeatureVector) -> Result<f32, ModelError> {
        if features.dimension() != self.weights.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.weights.len(),
                actual: features.dimension(),
                context: "Feature dimension doesn't match model weights".to_string(),
            });
        }

        let z = self.intercept
            + features
                .as_array()
                .iter()
                .zip(&self.weights)
                .map(|(x, w)| x * w)
                .sum::<f32>();

        if !z.is_finite() {
            return Err(ModelError::PredictionError(format!("Non-finite decision value {}", z)));
        }
        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

impl Predictor for LogisticRegression {
    fn input_dimension(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, features: &FeatureVector) -> Result<Label, ModelError> {
        let p = self.probability(features)?;
        Ok(if p >= self.threshold { Label::Positive } else { Label::Negative })
    }
}

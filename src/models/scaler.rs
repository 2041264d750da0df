use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::traits::features::{FeatureSchema, FeatureVector};
use crate::traits::model::{ModelError, Transform};

/// Standardizes each feature to zero mean and unit variance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Input fields, in column order
    features: FeatureSchema,
    /// Per-feature mean seen at fit time
    mean: Vec<f32>,
    /// Per-feature standard deviation (1.0 where the column was constant)
    scale: Vec<f32>,
}

impl StandardScaler {
    /// Create a scaler from already fitted parameters
    pub fn new(features: FeatureSchema, mean: Vec<f32>, scale: Vec<f32>) -> Result<Self, ModelError> {
        let scaler = Self { features, mean, scale };
        scaler.check()?;
        Ok(scaler)
    }

    /// Fit on training rows (one row per sample, columns in schema order)
    pub fn fit(features: FeatureSchema, rows: &Array2<f32>) -> Result<Self, ModelError> {
        if rows.nrows() == 0 {
            return Err(ModelError::InvalidParameter("Cannot fit scaler on empty data".to_string()));
        }
        if rows.ncols() != features.len() {
            return Err(ModelError::DimensionMismatch {
                expected: features.len(),
                actual: rows.ncols(),
                context: "training columns vs schema".to_string(),
            });
        }

        let mean = rows
            .mean_axis(Axis(0))
            .ok_or_else(|| ModelError::InvalidParameter("Cannot fit scaler on empty data".to_string()))?;
        // Population standard deviation; constant columns pass through unscaled
        let scale = rows
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f32::EPSILON { s } else { 1.0 });

        Self::new(features, mean.to_vec(), scale.to_vec())
    }

    pub fn mean(&self) -> &[f32] {
        &self.mean
    }

    pub fn scale(&self) -> &[f32] {
        &self.scale
    }

    /// Validate parameter shapes, used after deserialization too
    pub fn check(&self) -> Result<(), ModelError> {
        let n = self.features.len();
        if n == 0 {
            return Err(ModelError::InvalidParameter("Scaler has no features".to_string()));
        }
        if self.mean.len() != n || self.scale.len() != n {
            return Err(ModelError::DimensionMismatch {
                expected: n,
                actual: self.mean.len().min(self.scale.len()),
                context: "scaler parameters vs schema".to_string(),
            });
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(ModelError::InvalidParameter("Scaler scale must be finite and non-zero".to_string()));
        }
        Ok(())
    }
}

impl Transform for StandardScaler {
    fn schema(&self) -> &FeatureSchema {
        &self.features
    }

    fn output_dimension(&self) -> usize {
        self.features.len()
    }

    fn transform(&self, input: &FeatureVector) -> Result<FeatureVector, ModelError> {
        if input.dimension() != self.features.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.features.len(),
                actual: input.dimension(),
                context: "input vs scaler".to_string(),
            });
        }

        let mean = ArrayView1::from(self.mean.as_slice());
        let scale = ArrayView1::from(self.scale.as_slice());
        Ok(FeatureVector::from_array((input.as_array() - &mean) / &scale))
    }
}

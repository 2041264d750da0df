use std::sync::Arc;

use crate::traits::features::{FeatureRecord, FeatureSchema, FeatureVector};
use crate::traits::model::{Label, ModelError, Predictor, Transform};
use crate::traits::registry::{ModelVersionId, QualityScore};

/// Immutable transform/predictor pair with its version metadata.
///
/// The two halves are only ever replaced together, so a request can never pair
/// one generation's scaling with another generation's coefficients.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    version_id: ModelVersionId,
    quality_score: QualityScore,
    transform: Arc<dyn Transform>,
    predictor: Arc<dyn Predictor>,
}

impl ModelBundle {
    /// Assemble a bundle, checking the transform feeds the predictor
    pub fn new(
        version_id: ModelVersionId,
        quality_score: QualityScore,
        transform: Arc<dyn Transform>,
        predictor: Arc<dyn Predictor>,
    ) -> Result<Self, ModelError> {
        if transform.output_dimension() != predictor.input_dimension() {
            return Err(ModelError::DimensionMismatch {
                expected: predictor.input_dimension(),
                actual: transform.output_dimension(),
                context: format!("transform output vs predictor input for {}", version_id),
            });
        }

        Ok(Self {
            version_id,
            quality_score,
            transform,
            predictor,
        })
    }

    /// Same bundle with its score replaced by the one the registry recorded
    pub fn with_score(mut self, quality_score: QualityScore) -> Self {
        self.quality_score = quality_score;
        self
    }

    pub fn version_id(&self) -> &ModelVersionId {
        &self.version_id
    }

    pub fn quality_score(&self) -> QualityScore {
        self.quality_score
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.transform.schema()
    }

    pub fn transform(&self) -> &dyn Transform {
        self.transform.as_ref()
    }

    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_ref()
    }

    /// Encode, transform and classify one record
    pub fn evaluate(&self, record: &FeatureRecord) -> Result<Label, ModelError> {
        let encoded = self.schema().encode(record)?;
        self.evaluate_vector(&encoded)
    }

    /// Transform and classify an already encoded vector
    pub fn evaluate_vector(&self, encoded: &FeatureVector) -> Result<Label, ModelError> {
        let transformed = self.transform.transform(encoded)?;
        self.predictor.predict(&transformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::logistic::LogisticRegression;
    use crate::models::scaler::StandardScaler;

    fn scaler(n: usize) -> Arc<dyn Transform> {
        let names: Vec<String> = (0..n).map(|i| format!("f{}", i)).collect();
        Arc::new(StandardScaler::new(FeatureSchema::new(names), vec![0.0; n], vec![1.0; n]).unwrap())
    }

    #[test]
    fn test_bundle_dimension_check() {
        let predictor = Arc::new(LogisticRegression::new(vec![1.0, 1.0], 0.0).unwrap());
        let result = ModelBundle::new("run-1".into(), 0.8, scaler(3), predictor);
        assert!(matches!(result, Err(ModelError::DimensionMismatch { expected: 2, actual: 3, .. })));
    }

    #[test]
    fn test_bundle_evaluate() {
        let predictor = Arc::new(LogisticRegression::new(vec![1.0, 1.0], -1.0).unwrap());
        let bundle = ModelBundle::new("run-1".into(), 0.8, scaler(2), predictor).unwrap();

        assert_eq!(bundle.version_id().as_str(), "run-1");
        assert_eq!(bundle.quality_score(), 0.8);

        let record = FeatureRecord::new().with("f0", 2).with("f1", 0);
        assert_eq!(bundle.evaluate(&record).unwrap(), Label::Positive);

        let record = FeatureRecord::new().with("f0", 0).with("f1", 0);
        assert_eq!(bundle.evaluate(&record).unwrap(), Label::Negative);
    }

    #[test]
    fn test_bundle_with_score() {
        let predictor = Arc::new(LogisticRegression::new(vec![1.0], 0.0).unwrap());
        let bundle = ModelBundle::new("run-1".into(), 0.5, scaler(1), predictor).unwrap().with_score(0.9);
        assert_eq!(bundle.quality_score(), 0.9);
        assert_eq!(bundle.version_id().as_str(), "run-1");
    }
}

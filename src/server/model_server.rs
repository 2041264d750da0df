use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::models::bundle::ModelBundle;
use crate::traits::registry::{ModelVersionId, QualityScore};

/// Writer-side bookkeeping, only touched under the publish lock
#[derive(Debug, Default)]
struct AdoptionState {
    /// Every version ever put into service
    adopted: HashSet<ModelVersionId>,
}

/// Holds the bundle currently in service.
///
/// Readers take lock-free snapshots; publishers are serialized by a mutex that
/// is never held by a reader and never held across I/O.
#[derive(Debug)]
pub struct BundleHolder {
    /// Current bundle for predictions (many readers)
    current: ArcSwapOption<ModelBundle>,
    /// Serializes publishers
    state: Mutex<AdoptionState>,
    /// Number of successful publishes
    generation: AtomicUsize,
}

impl BundleHolder {
    /// Create an empty holder; predictions fail until the first publish
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            state: Mutex::new(AdoptionState::default()),
            generation: AtomicUsize::new(0),
        }
    }

    /// Current bundle, if any. The returned `Arc` stays valid across later swaps.
    pub fn snapshot(&self) -> Option<Arc<ModelBundle>> {
        self.current.load_full()
    }

    /// Quality score of the bundle in service, negative infinity before the first publish
    pub fn best_score(&self) -> QualityScore {
        match &*self.current.load() {
            Some(bundle) => bundle.quality_score(),
            None => QualityScore::NEG_INFINITY,
        }
    }

    /// Version of the bundle in service
    pub fn best_version(&self) -> Option<ModelVersionId> {
        match &*self.current.load() {
            Some(bundle) => Some(bundle.version_id().clone()),
            None => None,
        }
    }

    /// Number of bundles published so far
    pub fn generation(&self) -> usize {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether a candidate with this id and score would currently be adopted.
    ///
    /// Advisory only: a concurrent publish may change the answer, `publish`
    /// re-checks under the lock.
    pub fn would_adopt(&self, version_id: &ModelVersionId, score: QualityScore) -> bool {
        let state = self.state.lock();
        self.beats_current(&state, version_id, score)
    }

    /// Atomically replace the current bundle if the candidate is strictly better.
    ///
    /// Returns false, leaving everything untouched, unless the score is finite and
    /// exceeds the current best and the version has never been adopted.
    pub fn publish(&self, candidate: ModelBundle) -> bool {
        let mut state = self.state.lock();
        if !self.beats_current(&state, candidate.version_id(), candidate.quality_score()) {
            return false;
        }

        state.adopted.insert(candidate.version_id().clone());
        self.current.store(Some(Arc::new(candidate)));
        self.generation.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn beats_current(&self, state: &AdoptionState, version_id: &ModelVersionId, score: QualityScore) -> bool {
        score.is_finite() && score > self.best_score() && !state.adopted.contains(version_id)
    }
}

impl Default for BundleHolder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::logistic::LogisticRegression;
    use crate::models::scaler::StandardScaler;
    use crate::traits::features::{FeatureSchema, FeatureVector};
    use crate::traits::model::{Label, ModelError, Predictor, Transform};
    use rand::seq::SliceRandom;
    use rand::Rng;

    fn bundle(id: &str, score: f64) -> ModelBundle {
        let transform = StandardScaler::new(FeatureSchema::new(["x"]), vec![0.0], vec![1.0]).unwrap();
        let predictor = LogisticRegression::new(vec![1.0], 0.0).unwrap();
        ModelBundle::new(id.into(), score, Arc::new(transform), Arc::new(predictor)).unwrap()
    }

    /// Emits its tag as the single feature
    #[derive(Debug)]
    struct TaggedTransform {
        schema: FeatureSchema,
        tag: f32,
    }

    impl Transform for TaggedTransform {
        fn schema(&self) -> &FeatureSchema {
            &self.schema
        }

        fn output_dimension(&self) -> usize {
            1
        }

        fn transform(&self, _input: &FeatureVector) -> Result<FeatureVector, ModelError> {
            Ok(FeatureVector::new(vec![self.tag]))
        }
    }

    /// Fails unless fed the output of its own generation's transform
    #[derive(Debug)]
    struct TaggedPredictor {
        tag: f32,
    }

    impl Predictor for TaggedPredictor {
        fn input_dimension(&self) -> usize {
            1
        }

        fn predict(&self, features: &FeatureVector) -> Result<Label, ModelError> {
            if features.as_array()[0] == self.tag {
                Ok(Label::Positive)
            } else {
                Err(ModelError::PredictionError("mixed generations".to_string()))
            }
        }
    }

    fn tagged_bundle(generation: usize) -> ModelBundle {
        let tag = generation as f32;
        ModelBundle::new(
            ModelVersionId::new(format!("v{}", generation)),
            generation as f64,
            Arc::new(TaggedTransform { schema: FeatureSchema::new(["x"]), tag }),
            Arc::new(TaggedPredictor { tag }),
        )
        .unwrap()
    }

    #[test]
    fn test_holder_creation() {
        let holder = BundleHolder::new();

        assert!(holder.snapshot().is_none());
        assert_eq!(holder.best_score(), f64::NEG_INFINITY);
        assert_eq!(holder.best_version(), None);
        assert_eq!(holder.generation(), 0);
    }

    #[test]
    fn test_holder_first_publish() {
        let holder = BundleHolder::new();

        assert!(holder.publish(bundle("v1", 0.8)));
        assert_eq!(holder.best_score(), 0.8);
        assert_eq!(holder.best_version(), Some("v1".into()));
        assert_eq!(holder.generation(), 1);
        assert_eq!(holder.snapshot().unwrap().version_id().as_str(), "v1");
    }

    #[test]
    fn test_holder_no_downgrade() {
        let holder = BundleHolder::new();
        holder.publish(bundle("v1", 0.8));

        assert!(!holder.publish(bundle("v2", 0.75)));
        // Ties are not upgrades either
        assert!(!holder.publish(bundle("v3", 0.8)));

        assert_eq!(holder.best_version(), Some("v1".into()));
        assert_eq!(holder.best_score(), 0.8);
        assert_eq!(holder.generation(), 1);
    }

    #[test]
    fn test_holder_rejects_readoption() {
        let holder = BundleHolder::new();

        assert!(holder.publish(bundle("v1", 0.8)));
        assert!(!holder.publish(bundle("v1", 0.8)));
        assert!(!holder.publish(bundle("v1", 0.9)));

        // A version that was replaced cannot come back either
        assert!(holder.publish(bundle("v2", 0.85)));
        assert!(!holder.publish(bundle("v1", 0.95)));
        assert_eq!(holder.best_version(), Some("v2".into()));
        assert_eq!(holder.generation(), 2);
    }

    #[test]
    fn test_holder_rejects_nan() {
        let holder = BundleHolder::new();
        assert!(!holder.publish(bundle("v1", f64::NAN)));
        assert!(holder.snapshot().is_none());
    }

    #[test]
    fn test_holder_rejects_infinite() {
        let holder = BundleHolder::new();
        assert!(!holder.publish(bundle("v1", f64::INFINITY)));
        assert!(!holder.would_adopt(&"v1".into(), f64::INFINITY));
        assert!(holder.snapshot().is_none());

        // An infinite score can never block later upgrades
        assert!(holder.publish(bundle("v2", 0.7)));
        assert!(!holder.publish(bundle("v3", f64::INFINITY)));
        assert!(holder.publish(bundle("v4", 0.8)));
        assert_eq!(holder.best_version(), Some("v4".into()));
    }

    #[test]
    fn test_holder_would_adopt() {
        let holder = BundleHolder::new();
        assert!(holder.would_adopt(&"v1".into(), 0.1));

        holder.publish(bundle("v1", 0.5));
        assert!(!holder.would_adopt(&"v1".into(), 0.9));
        assert!(!holder.would_adopt(&"v2".into(), 0.5));
        assert!(holder.would_adopt(&"v2".into(), 0.6));
    }

    #[test]
    fn test_holder_snapshot_survives_swap() {
        let holder = BundleHolder::new();
        holder.publish(bundle("v1", 0.8));

        let old = holder.snapshot().unwrap();
        holder.publish(bundle("v2", 0.9));

        assert_eq!(old.version_id().as_str(), "v1");
        assert_eq!(holder.snapshot().unwrap().version_id().as_str(), "v2");
    }

    #[test]
    fn test_holder_monotonic_in_any_order() {
        let mut rng = rand::rng();
        let mut scores: Vec<f64> = (0..200).map(|_| rng.random_range(0.0..1.0)).collect();
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        scores.shuffle(&mut rng);

        let holder = BundleHolder::new();
        let mut last = f64::NEG_INFINITY;
        for (i, score) in scores.iter().enumerate() {
            holder.publish(bundle(&format!("v{}", i), *score));
            assert!(holder.best_score() >= last);
            last = holder.best_score();
        }

        assert_eq!(holder.best_score(), max);
    }

    #[test]
    fn test_holder_concurrent_publishers() {
        let holder = BundleHolder::new();

        crossbeam::scope(|s| {
            for t in 0..8 {
                let holder = &holder;
                s.spawn(move |_| {
                    for i in 0..50 {
                        let score = (i * 8 + t) as f64;
                        holder.publish(bundle(&format!("v{}-{}", t, i), score));
                    }
                });
            }
        })
        .unwrap();

        assert_eq!(holder.best_score(), (49 * 8 + 7) as f64);
        assert_eq!(holder.best_version(), Some("v7-49".into()));
    }

    #[test]
    fn test_holder_snapshot_never_mixes_generations() {
        let holder = BundleHolder::new();
        holder.publish(tagged_bundle(1));
        let input = FeatureVector::new(vec![0.0]);

        crossbeam::scope(|s| {
            s.spawn(|_| {
                for generation in 2..500 {
                    assert!(holder.publish(tagged_bundle(generation)));
                }
            });

            for _ in 0..4 {
                let holder = &holder;
                let input = &input;
                s.spawn(move |_| {
                    let mut seen = 0.0;
                    for _ in 0..2000 {
                        let snapshot = holder.snapshot().unwrap();
                        assert_eq!(snapshot.evaluate_vector(input).unwrap(), Label::Positive);
                        // Generations only move forward
                        assert!(snapshot.quality_score() >= seen);
                        seen = snapshot.quality_score();
                    }
                });
            }
        })
        .unwrap();

        assert_eq!(holder.generation(), 499);
    }
}

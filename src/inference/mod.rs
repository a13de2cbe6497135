// Inference module - keyword classifier invocation
//
// The loaded model is process-wide state: it is built once at startup,
// never mutated afterwards, and shared behind an `Arc<InferenceEngine>`.
// Runtimes generally forbid concurrent invocation of one session, so every
// model instance sits behind its own mutex. With more than one instance,
// callers are spread round-robin across the pool.

pub mod onnx;

pub use onnx::OnnxClassifier;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ndarray::{Array4, Axis};
use serde::{Deserialize, Serialize};

use crate::analysis::FeatureMap;
use crate::config::InferenceConfig;
use crate::error::InferenceError;

/// A model that maps one batched feature tensor to raw output values
pub trait Classifier: Send {
    /// Declared input dims; `None` marks a dynamic dimension
    fn input_shape(&self) -> &[Option<usize>];

    /// Run the model on a `[1, frames, bins, 1]` tensor
    fn predict(&mut self, input: Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

/// Probability and thresholded decision for one recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub probability: f32,
    pub detected: bool,
}

impl DetectionResult {
    pub fn from_probability(probability: f32, threshold: f32) -> Self {
        Self {
            probability,
            detected: probability >= threshold,
        }
    }
}

/// Immutable handle over one or more loaded model instances
pub struct InferenceEngine {
    instances: Vec<Mutex<Box<dyn Classifier>>>,
    input_shape: Vec<Option<usize>>,
    threshold: f32,
    next_instance: AtomicUsize,
}

impl InferenceEngine {
    /// Load `config.instances` sessions of the configured artifact
    ///
    /// Any failure here is fatal: without an engine no pipeline can be built.
    pub fn load(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let count = config.instances.max(1);
        let mut classifiers: Vec<Box<dyn Classifier>> = Vec::with_capacity(count);
        for _ in 0..count {
            classifiers.push(Box::new(OnnxClassifier::load(&config.model_path)?));
        }

        tracing::info!(
            "[InferenceEngine] Loaded {} instance(s) of {}",
            count,
            config.model_path.display()
        );

        Self::from_classifiers(classifiers, config.detection_threshold)
    }

    /// Wrap already constructed classifiers
    ///
    /// All instances must declare the same input shape.
    pub fn from_classifiers(
        classifiers: Vec<Box<dyn Classifier>>,
        threshold: f32,
    ) -> Result<Self, InferenceError> {
        let Some(first) = classifiers.first() else {
            return Err(InferenceError::ModelLoad {
                path: "<in-process>".to_string(),
                reason: "no classifier instances".to_string(),
            });
        };
        let input_shape = first.input_shape().to_vec();

        if let Some(other) = classifiers
            .iter()
            .find(|classifier| classifier.input_shape() != input_shape.as_slice())
        {
            return Err(InferenceError::ModelLoad {
                path: "<in-process>".to_string(),
                reason: format!(
                    "instances disagree on input shape: {:?} vs {:?}",
                    input_shape,
                    other.input_shape()
                ),
            });
        }

        Ok(Self {
            instances: classifiers.into_iter().map(Mutex::new).collect(),
            input_shape,
            threshold,
            next_instance: AtomicUsize::new(0),
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn input_shape(&self) -> &[Option<usize>] {
        &self.input_shape
    }

    /// Classify one feature map
    ///
    /// Adds batch and channel dims, invokes one model instance and squeezes
    /// the output back to a single probability.
    pub fn detect(&self, features: &FeatureMap) -> Result<DetectionResult, InferenceError> {
        let (frames, bins) = features.dim();
        let actual = vec![1, frames, bins, 1];
        self.check_shape(&actual)?;

        let input = features
            .clone()
            .insert_axis(Axis(0))
            .insert_axis(Axis(3));

        let index = self.next_instance.fetch_add(1, Ordering::Relaxed) % self.instances.len();
        let output = {
            let mut classifier = self.instances[index]
                .lock()
                .map_err(|_| InferenceError::LockPoisoned)?;
            classifier.predict(input)?
        };

        let probability = squeeze_probability(&output)?;
        let result = DetectionResult::from_probability(probability, self.threshold);

        tracing::debug!(
            "[InferenceEngine] Instance {} -> probability {:.4} (detected={})",
            index,
            result.probability,
            result.detected
        );

        Ok(result)
    }

    fn check_shape(&self, actual: &[usize]) -> Result<(), InferenceError> {
        let matches = self.input_shape.len() == actual.len()
            && self
                .input_shape
                .iter()
                .zip(actual)
                .all(|(expected, &dim)| expected.map_or(true, |size| size == dim));

        if matches {
            Ok(())
        } else {
            Err(InferenceError::ShapeMismatch {
                expected: self.input_shape.clone(),
                actual: actual.to_vec(),
            })
        }
    }
}

fn squeeze_probability(output: &[f32]) -> Result<f32, InferenceError> {
    let [probability] = output else {
        return Err(InferenceError::InvalidOutput {
            reason: format!("expected one value, got {}", output.len()),
        });
    };

    if !probability.is_finite() || !(0.0..=1.0).contains(probability) {
        return Err(InferenceError::InvalidOutput {
            reason: format!("probability {} outside [0, 1]", probability),
        });
    }

    Ok(*probability)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::sync::Arc;

    /// Deterministic stand-in: logistic of the mean feature value
    struct MeanClassifier {
        shape: Vec<Option<usize>>,
        calls: Arc<AtomicUsize>,
    }

    impl MeanClassifier {
        fn boxed(shape: Vec<Option<usize>>, calls: Arc<AtomicUsize>) -> Box<dyn Classifier> {
            Box::new(Self { shape, calls })
        }
    }

    impl Classifier for MeanClassifier {
        fn input_shape(&self) -> &[Option<usize>] {
            &self.shape
        }

        fn predict(&mut self, input: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mean = input.mean().unwrap_or(0.0);
            Ok(vec![1.0 / (1.0 + (-mean).exp())])
        }
    }

    struct FixedOutput(Vec<f32>);

    impl Classifier for FixedOutput {
        fn input_shape(&self) -> &[Option<usize>] {
            &[None, Some(99), Some(27), Some(1)]
        }

        fn predict(&mut self, _input: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }
    }

    fn default_shape() -> Vec<Option<usize>> {
        vec![Some(1), Some(99), Some(27), Some(1)]
    }

    fn engine(instances: usize) -> (InferenceEngine, Vec<Arc<AtomicUsize>>) {
        let counters: Vec<Arc<AtomicUsize>> =
            (0..instances).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let classifiers = counters
            .iter()
            .map(|calls| MeanClassifier::boxed(default_shape(), calls.clone()))
            .collect();
        (
            InferenceEngine::from_classifiers(classifiers, 0.5).unwrap(),
            counters,
        )
    }

    #[test]
    fn test_detect_is_deterministic() {
        let (engine, _) = engine(1);
        let features = Array2::from_shape_fn((99, 27), |(t, f)| ((t * 27 + f) % 13) as f32 * 0.1 - 0.6);

        let a = engine.detect(&features).unwrap();
        let b = engine.detect(&features).unwrap();
        assert_eq!(a.probability.to_bits(), b.probability.to_bits());
        assert_eq!(a.detected, b.detected);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let (engine, _) = engine(1);
        // Mean 0 -> sigmoid 0.5 exactly
        let result = engine.detect(&Array2::zeros((99, 27))).unwrap();
        assert_eq!(result.probability, 0.5);
        assert!(result.detected);

        let result = engine.detect(&Array2::from_elem((99, 27), -6.0)).unwrap();
        assert!(result.probability < 0.5);
        assert!(!result.detected);
    }

    #[test]
    fn test_shape_mismatch_is_rejected_before_invocation() {
        let (engine, counters) = engine(1);
        match engine.detect(&Array2::zeros((98, 27))) {
            Err(InferenceError::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, default_shape());
                assert_eq!(actual, vec![1, 98, 27, 1]);
            }
            other => panic!("Expected ShapeMismatch, got {:?}", other),
        }
        assert_eq!(counters[0].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dynamic_batch_dimension_accepted() {
        let engine =
            InferenceEngine::from_classifiers(vec![Box::new(FixedOutput(vec![0.9]))], 0.5).unwrap();
        let result = engine.detect(&Array2::zeros((99, 27))).unwrap();
        assert_eq!(result.probability, 0.9);
        assert!(result.detected);
    }

    #[test]
    fn test_invalid_outputs_rejected() {
        for output in [vec![], vec![0.2, 0.3], vec![f32::NAN], vec![1.5]] {
            let engine =
                InferenceEngine::from_classifiers(vec![Box::new(FixedOutput(output))], 0.5)
                    .unwrap();
            assert!(matches!(
                engine.detect(&Array2::zeros((99, 27))),
                Err(InferenceError::InvalidOutput { .. })
            ));
        }
    }

    #[test]
    fn test_round_robin_across_instances() {
        let (engine, counters) = engine(3);
        let features = Array2::zeros((99, 27));
        for _ in 0..6 {
            engine.detect(&features).unwrap();
        }
        for calls in &counters {
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }

    #[test]
    fn test_concurrent_callers_share_engine() {
        let (engine, counters) = engine(2);
        let engine = Arc::new(engine);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let features = Array2::from_elem((99, 27), 0.25);
                    (0..10)
                        .map(|_| engine.detect(&features).unwrap().probability)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<f32> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        assert_eq!(results.len(), 40);
        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
        let total: usize = counters.iter().map(|c| c.load(Ordering::SeqCst)).sum();
        assert_eq!(total, 40);
    }

    #[test]
    fn test_empty_or_mismatched_pool_rejected() {
        assert!(matches!(
            InferenceEngine::from_classifiers(Vec::new(), 0.5),
            Err(InferenceError::ModelLoad { .. })
        ));

        let calls = Arc::new(AtomicUsize::new(0));
        let mixed = vec![
            MeanClassifier::boxed(default_shape(), calls.clone()),
            MeanClassifier::boxed(vec![Some(1), Some(49), Some(27), Some(1)], calls),
        ];
        assert!(InferenceEngine::from_classifiers(mixed, 0.5).is_err());
    }

    #[test]
    fn test_load_missing_model_fails() {
        let config = InferenceConfig {
            model_path: "/nonexistent/model.onnx".into(),
            ..InferenceConfig::default()
        };
        assert!(matches!(
            InferenceEngine::load(&config),
            Err(InferenceError::ModelLoad { .. })
        ));
    }
}

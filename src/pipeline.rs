//! Keyword detection pipeline facade
//!
//! The two entry points the surrounding service calls:
//! - [`KeywordPipeline::extract_and_detect`]: raw bytes → detection decision
//! - [`KeywordPipeline::measure_noise_level`]: raw bytes → dBFS
//!
//! Every stage is a deterministic computation over its input, so failures
//! are reported once and never retried.

use std::sync::Arc;

use crate::analysis::{ExtractedFeatures, FeatureExtractor, NoiseLevelMeter};
use crate::audio::AudioLoader;
use crate::config::PipelineConfig;
use crate::error::{log_pipeline_error, PipelineError};
use crate::inference::{DetectionResult, InferenceEngine};

/// Shared, immutable pipeline; cheap to clone
#[derive(Clone)]
pub struct KeywordPipeline {
    config: Arc<PipelineConfig>,
    loader: AudioLoader,
    extractor: Arc<FeatureExtractor>,
    meter: NoiseLevelMeter,
    engine: Arc<InferenceEngine>,
}

impl KeywordPipeline {
    /// Build the pipeline around an already loaded engine
    ///
    /// Fails if the configuration is invalid or the model's declared input
    /// cannot accept the feature maps this configuration produces.
    pub fn new(config: PipelineConfig, engine: Arc<InferenceEngine>) -> Result<Self, PipelineError> {
        let extractor = FeatureExtractor::new(&config)?;

        let [frames, bins] = extractor.feature_shape();
        let expected = engine.input_shape();
        let compatible = expected.len() == 4
            && [1, frames, bins, 1]
                .iter()
                .zip(expected)
                .all(|(&dim, declared)| declared.map_or(true, |size| size == dim));
        if !compatible {
            return Err(crate::error::InferenceError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: vec![1, frames, bins, 1],
            }
            .into());
        }

        Ok(Self {
            loader: AudioLoader::new(config.audio.sample_rate),
            meter: NoiseLevelMeter::new(config.noise.full_scale, config.noise.floor_dbfs),
            extractor: Arc::new(extractor),
            config: Arc::new(config),
            engine,
        })
    }

    /// Load the configured model and build the pipeline
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let engine = InferenceEngine::load(&config.inference)?;
        Self::new(config, Arc::new(engine))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<InferenceEngine> {
        &self.engine
    }

    /// Decode a recording and compute its feature map
    pub fn extract_features(
        &self,
        audio_bytes: &[u8],
        hint: Option<&str>,
    ) -> Result<ExtractedFeatures, PipelineError> {
        let buffer = self.loader.load(audio_bytes, hint)?;
        Ok(self.extractor.extract(&buffer.samples)?)
    }

    /// Full pipeline: decode, locate, normalize, spectrogram, pool, classify
    pub fn extract_and_detect(
        &self,
        audio_bytes: &[u8],
        hint: Option<&str>,
    ) -> Result<DetectionResult, PipelineError> {
        let result = self
            .extract_features(audio_bytes, hint)
            .and_then(|extracted| {
                let detection = self.engine.detect(&extracted.features)?;
                tracing::info!(
                    "[Pipeline] Window offset {}, features {:?} -> probability {:.4}, detected={}",
                    extracted.selection.offset,
                    extracted.features.shape(),
                    detection.probability,
                    detection.detected
                );
                Ok(detection)
            });

        if let Err(err) = &result {
            log_pipeline_error(err, "extract_and_detect");
        }
        result
    }

    /// Loudness of a noise-only recording in dBFS
    ///
    /// Measured at the recording's native sample rate.
    pub fn measure_noise_level(
        &self,
        audio_bytes: &[u8],
        hint: Option<&str>,
    ) -> Result<f32, PipelineError> {
        let buffer = self.loader.decode(audio_bytes, hint).map_err(|err| {
            let err = PipelineError::from(err);
            log_pipeline_error(&err, "measure_noise_level");
            err
        })?;

        let level = self.meter.measure(&buffer.samples);
        tracing::info!(
            "[Pipeline] Noise level {:.2} dBFS over {} samples",
            level,
            buffer.len()
        );
        Ok(level)
    }
}

//! Configuration management for the keyword detection pipeline
//!
//! Every numeric constant the pipeline depends on (window length, framing,
//! pooling, detection threshold, model path) lives here so it can be tested
//! and overridden from a JSON file without recompilation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AudioError;

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub spectrogram: SpectrogramConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub noise: NoiseConfig,
}

/// Decoding and keyword window parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Rate every recording is resampled to, in Hz
    pub sample_rate: u32,
    /// Length of the keyword window in seconds
    pub word_duration_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            word_duration_secs: 1.0,
        }
    }
}

impl AudioConfig {
    /// Number of samples in one keyword window
    pub fn window_samples(&self) -> usize {
        (self.sample_rate as f32 * self.word_duration_secs).round() as usize
    }
}

/// Spectrogram framing and compression parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// FFT frame length in samples (20 ms at 16 kHz)
    pub frame_length: usize,
    /// Hop between frames in samples (10 ms at 16 kHz)
    pub frame_step: usize,
    /// Average pooling window and stride as [time, frequency]
    pub pooling: [usize; 2],
    /// Added before log10 so exact zeros stay finite
    pub log_epsilon: f32,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            frame_length: 320,
            frame_step: 160,
            pooling: [1, 6],
            log_epsilon: 1e-6,
        }
    }
}

/// Classifier parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Quantized ONNX artifact loaded once at startup
    pub model_path: PathBuf,
    /// Probability at or above which the keyword counts as detected
    pub detection_threshold: f32,
    /// Independent model instances; 1 serializes every invocation
    pub instances: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("data/model.onnx"),
            detection_threshold: 0.5,
            instances: 1,
        }
    }
}

/// Background noise measurement parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Amplitude treated as 0 dBFS
    pub full_scale: f32,
    /// Reported for digital silence instead of negative infinity
    pub floor_dbfs: f32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            full_scale: 1.0,
            floor_dbfs: -120.0,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration, or the defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Check that the parameters describe a computable feature map
    pub fn validate(&self) -> Result<(), AudioError> {
        let invalid = |reason: String| Err(AudioError::InvalidConfig { reason });

        if self.audio.sample_rate == 0 {
            return invalid("sample_rate must be > 0".to_string());
        }
        if !(self.audio.word_duration_secs > 0.0) {
            return invalid(format!(
                "word_duration_secs must be > 0 (got {})",
                self.audio.word_duration_secs
            ));
        }
        let window = self.audio.window_samples();
        let spec = &self.spectrogram;
        if spec.frame_length < 2 || spec.frame_step == 0 {
            return invalid(format!(
                "frame_length must be >= 2 and frame_step > 0 (got {} / {})",
                spec.frame_length, spec.frame_step
            ));
        }
        if spec.frame_length > window {
            return invalid(format!(
                "frame_length {} exceeds keyword window of {} samples",
                spec.frame_length, window
            ));
        }
        if spec.pooling.contains(&0) {
            return invalid(format!("pooling window must be non-zero (got {:?})", spec.pooling));
        }
        if !(spec.log_epsilon > 0.0) {
            return invalid(format!("log_epsilon must be > 0 (got {})", spec.log_epsilon));
        }
        if !(0.0..=1.0).contains(&self.inference.detection_threshold) {
            return invalid(format!(
                "detection_threshold must be within [0, 1] (got {})",
                self.inference.detection_threshold
            ));
        }
        if self.inference.instances == 0 {
            return invalid("inference instances must be >= 1".to_string());
        }
        if !(self.noise.full_scale > 0.0) {
            return invalid(format!(
                "noise full_scale must be > 0 (got {})",
                self.noise.full_scale
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.audio.sample_rate, 16_000);
        assert_eq!(config.audio.window_samples(), 16_000);
        assert_eq!(config.spectrogram.frame_length, 320);
        assert_eq!(config.spectrogram.frame_step, 160);
        assert_eq!(config.spectrogram.pooling, [1, 6]);
        assert_eq!(config.inference.detection_threshold, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_section_defaults() {
        let json = r#"{ "inference": { "model_path": "m.onnx", "detection_threshold": 0.7, "instances": 2 } }"#;
        let parsed: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.inference.detection_threshold, 0.7);
        assert_eq!(parsed.inference.instances, 2);
        assert_eq!(parsed.spectrogram, SpectrogramConfig::default());

        let parsed: PipelineConfig =
            serde_json::from_str(r#"{ "noise": { "floor_dbfs": -90.0 } }"#).unwrap();
        assert_eq!(parsed.noise.floor_dbfs, -90.0);
        assert_eq!(parsed.noise.full_scale, 1.0);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = PipelineConfig::load_from_file("/nonexistent/kws_config.json");
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_validate_rejects_frame_longer_than_window() {
        let mut config = PipelineConfig::default();
        config.audio.word_duration_secs = 0.01;
        match config.validate() {
            Err(AudioError::InvalidConfig { reason }) => assert!(reason.contains("frame_length")),
            other => panic!("Expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_pooling_and_bad_threshold() {
        let mut config = PipelineConfig::default();
        config.spectrogram.pooling = [1, 0];
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.inference.detection_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.inference.instances = 0;
        assert!(config.validate().is_err());
    }
}

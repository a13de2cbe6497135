// Analysis module - keyword feature extraction
//
// Turns a decoded 16 kHz mono recording into the feature map the classifier
// consumes.
//
// Module organization:
// - window: energy-based keyword window search
// - normalize: fixed-length framing and peak normalization
// - spectrogram: framed power spectrum (FFT)
// - pooling: frequency pooling and log compression
// - noise: background loudness in dBFS (independent of the keyword path)
// - mod.rs: Coordinator (FeatureExtractor)
//
// Stage order:
// 1. Locate the loudest keyword-length window
// 2. Pad/truncate to the fixed window length
// 3. Zero-center and peak-scale to [-1, 1]
// 4. Power spectrogram (320-sample frames, 160-sample hop)
// 5. Average pool [1, 6] with "same" padding, then log10(x + 1e-6)

pub mod noise;
pub mod normalize;
pub mod pooling;
pub mod spectrogram;
pub mod window;

pub use noise::NoiseLevelMeter;
pub use normalize::{fix_length, normalize};
pub use pooling::{FeatureMap, PoolingCompressor};
pub use spectrogram::{SpectrogramExtractor, SpectrogramTensor};
pub use window::{KeywordWindowLocator, WindowSelection};

use crate::config::PipelineConfig;
use crate::error::AudioError;

/// Feature map plus the window it was computed from
#[derive(Debug, Clone)]
pub struct ExtractedFeatures {
    pub features: FeatureMap,
    pub selection: WindowSelection,
}

/// FeatureExtractor coordinates the DSP stages for one recording at a time
///
/// Holds only immutable, pre-computed state (FFT plan, Hann window), so one
/// instance can be shared between threads.
pub struct FeatureExtractor {
    locator: KeywordWindowLocator,
    window_length: usize,
    spectrogram: SpectrogramExtractor,
    compressor: PoolingCompressor,
}

impl FeatureExtractor {
    /// Build the stages from validated configuration
    pub fn new(config: &PipelineConfig) -> Result<Self, AudioError> {
        config.validate()?;
        let window_length = config.audio.window_samples();

        Ok(Self {
            locator: KeywordWindowLocator::with_window_size(window_length),
            window_length,
            spectrogram: SpectrogramExtractor::new(
                config.spectrogram.frame_length,
                config.spectrogram.frame_step,
            ),
            compressor: PoolingCompressor::new(
                config.spectrogram.pooling,
                config.spectrogram.log_epsilon,
            ),
        })
    }

    /// Shape of every feature map this extractor produces
    pub fn feature_shape(&self) -> [usize; 2] {
        let frames = self.spectrogram.frame_count(self.window_length);
        self.compressor
            .output_shape(frames, self.spectrogram.bin_count())
    }

    /// Run all stages over a mono buffer at the configured sample rate
    pub fn extract(&self, samples: &[f32]) -> Result<ExtractedFeatures, AudioError> {
        let (selection, window) = self.locator.locate(samples)?;

        let fixed = fix_length(window, self.window_length);
        let normalized = normalize(&fixed)?;
        let spectrogram = self.spectrogram.extract(&normalized)?;
        let features = self.compressor.compress(&spectrogram);

        tracing::debug!(
            "[FeatureExtractor] Window offset {} ({} candidates) -> features {:?}",
            selection.offset,
            selection.candidates,
            features.shape()
        );

        Ok(ExtractedFeatures {
            features,
            selection,
        })
    }
}

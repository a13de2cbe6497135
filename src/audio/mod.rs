// Audio module - container decoding, resampling and noise augmentation

pub mod augment;
pub mod loader;
pub mod resample;

// Re-export commonly used types for convenience
pub use augment::{add_noise, DEFAULT_NOISE_SCALE};
pub use loader::{convert_to_canonical_wav, AudioLoader};

/// Decoded PCM owned by the call that produced it
///
/// Samples are mono after loading; `channels` records the channel count of
/// the source stream before the downmix.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl RawAudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

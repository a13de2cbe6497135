//! Synthetic recordings for tests and the CLI harness.
//!
//! Generating PCM procedurally keeps the pipeline testable without shipping
//! participant recordings: a tone burst inside silence stands in for a spoken
//! keyword, white noise for a noisy room.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::audio::loader::encode_pcm16_wav;
use crate::error::AudioError;

/// Supported deterministic waveform patterns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticPattern {
    /// Continuous sine for the whole duration
    Sine,
    /// Silence with a sine burst at `burst_offset_ms`
    ToneBurst,
    /// Uniform noise in `[-amplitude, amplitude)` from a fixed seed
    WhiteNoise,
    /// Digital silence
    Silence,
}

/// Declarative description of a synthetic recording.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyntheticSpec {
    pub pattern: SyntheticPattern,
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f32,
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u32,
    #[serde(default)]
    pub burst_offset_ms: u32,
    #[serde(default = "default_burst_duration_ms")]
    pub burst_duration_ms: u32,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            pattern: SyntheticPattern::Sine,
            frequency_hz: default_frequency_hz(),
            amplitude: default_amplitude(),
            duration_ms: default_duration_ms(),
            burst_offset_ms: 0,
            burst_duration_ms: default_burst_duration_ms(),
            seed: default_seed(),
        }
    }
}

impl SyntheticSpec {
    /// Silence of `duration_ms` with a tone burst
    pub fn tone_burst(duration_ms: u32, burst_offset_ms: u32, burst_duration_ms: u32) -> Self {
        Self {
            pattern: SyntheticPattern::ToneBurst,
            duration_ms,
            burst_offset_ms,
            burst_duration_ms,
            ..Self::default()
        }
    }

    /// Render the pattern at `sample_rate`.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let total = duration_frames(self.duration_ms, sample_rate);
        let step = self.frequency_hz / sample_rate.max(1) as f32;
        let sine = |i: usize| self.amplitude * (2.0 * PI * step * i as f32).sin();

        match self.pattern {
            SyntheticPattern::Sine => (0..total).map(sine).collect(),
            SyntheticPattern::ToneBurst => {
                let start = duration_frames(self.burst_offset_ms, sample_rate).min(total);
                let end = (start + duration_frames(self.burst_duration_ms, sample_rate)).min(total);
                (0..total)
                    .map(|i| if (start..end).contains(&i) { sine(i - start) } else { 0.0 })
                    .collect()
            }
            SyntheticPattern::WhiteNoise => {
                let mut rng = StdRng::seed_from_u64(self.seed);
                let amplitude = self.amplitude.abs();
                if amplitude == 0.0 {
                    return vec![0.0; total];
                }
                (0..total)
                    .map(|_| rng.gen_range(-amplitude..amplitude))
                    .collect()
            }
            SyntheticPattern::Silence => vec![0.0; total],
        }
    }

    /// Render and encode as 16-bit mono WAV bytes.
    pub fn to_wav(&self, sample_rate: u32) -> Result<Vec<u8>, AudioError> {
        encode_wav(&self.render(sample_rate), sample_rate)
    }
}

/// Encode mono samples as 16-bit PCM WAV bytes.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    encode_pcm16_wav(samples, sample_rate)
}

fn duration_frames(duration_ms: u32, sample_rate: u32) -> usize {
    ((duration_ms as f64 / 1_000.0) * sample_rate as f64).round() as usize
}

fn default_frequency_hz() -> f32 {
    440.0
}

fn default_amplitude() -> f32 {
    0.8
}

fn default_duration_ms() -> u32 {
    1_000
}

fn default_burst_duration_ms() -> u32 {
    300
}

fn default_seed() -> u64 {
    0x5A5A_FFF0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_length_and_amplitude() {
        let spec = SyntheticSpec {
            duration_ms: 500,
            amplitude: 0.5,
            ..SyntheticSpec::default()
        };
        let samples = spec.render(16_000);
        assert_eq!(samples.len(), 8_000);
        let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak <= 0.5 && peak > 0.49);
    }

    #[test]
    fn test_tone_burst_confined_to_burst_region() {
        let samples = SyntheticSpec::tone_burst(3_000, 1_200, 400).render(16_000);
        assert_eq!(samples.len(), 48_000);
        assert!(samples[..19_200].iter().all(|&s| s == 0.0));
        assert!(samples[25_600..].iter().all(|&s| s == 0.0));
        assert!(samples[19_200..25_600].iter().any(|&s| s.abs() > 0.5));
    }

    #[test]
    fn test_white_noise_is_seeded() {
        let spec = SyntheticSpec {
            pattern: SyntheticPattern::WhiteNoise,
            amplitude: 0.3,
            ..SyntheticSpec::default()
        };
        let a = spec.render(16_000);
        assert_eq!(a, spec.render(16_000));
        assert!(a.iter().all(|s| s.abs() <= 0.3));
    }

    #[test]
    fn test_silence_and_wav_header() {
        let spec = SyntheticSpec {
            pattern: SyntheticPattern::Silence,
            duration_ms: 250,
            ..SyntheticSpec::default()
        };
        let bytes = spec.to_wav(16_000).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        // 44-byte header + 2 bytes per sample
        assert_eq!(bytes.len(), 44 + 4_000 * 2);
    }

    #[test]
    fn test_spec_json_defaults() {
        let spec: SyntheticSpec = serde_json::from_str(r#"{ "pattern": "tone_burst" }"#).unwrap();
        assert_eq!(spec.pattern, SyntheticPattern::ToneBurst);
        assert_eq!(spec.duration_ms, 1_000);
        assert_eq!(spec.frequency_hz, 440.0);
    }
}

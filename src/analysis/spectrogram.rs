// Spectrogram module - framed power spectrum via short-time Fourier transform
//
// The keyword window is cut into overlapping frames (20 ms frames every 10 ms
// at 16 kHz by default). Each frame is Hann-windowed and transformed with an
// FFT of the frame length; the magnitude-squared positive-frequency bins form
// one row of the spectrogram.

use std::sync::Arc;

use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::AudioError;

/// Frames × frequency bins, all values non-negative
pub type SpectrogramTensor = Array2<f32>;

/// Computes power spectrograms with a pre-planned FFT
pub struct SpectrogramExtractor {
    fft: Arc<dyn Fft<f32>>,
    frame_length: usize,
    frame_step: usize,
    /// Periodic Hann window (pre-computed)
    window: Vec<f32>,
}

impl SpectrogramExtractor {
    /// Create a new extractor
    ///
    /// # Arguments
    /// * `frame_length` - Samples per frame, also the FFT size
    /// * `frame_step` - Samples between consecutive frame starts
    pub fn new(frame_length: usize, frame_step: usize) -> Self {
        let window = (0..frame_length)
            .map(|i| {
                0.5 * (1.0 - ((2.0 * std::f32::consts::PI * i as f32) / frame_length as f32).cos())
            })
            .collect();

        let fft = FftPlanner::new().plan_fft_forward(frame_length);

        Self {
            fft,
            frame_length,
            frame_step: frame_step.max(1),
            window,
        }
    }

    /// Number of positive-frequency bins per frame
    pub fn bin_count(&self) -> usize {
        self.frame_length / 2 + 1
    }

    /// Number of frames produced for `len` input samples
    pub fn frame_count(&self, len: usize) -> usize {
        if len < self.frame_length {
            0
        } else {
            (len - self.frame_length) / self.frame_step + 1
        }
    }

    /// Compute the magnitude-squared spectrogram of `samples`
    ///
    /// # Returns
    /// Array of shape `[frame_count, frame_length / 2 + 1]`
    pub fn extract(&self, samples: &[f32]) -> Result<SpectrogramTensor, AudioError> {
        let frames = self.frame_count(samples.len());
        if frames == 0 {
            return Err(AudioError::InsufficientAudio {
                required: self.frame_length,
                available: samples.len(),
            });
        }

        let bins = self.bin_count();
        let mut spectrogram = Array2::<f32>::zeros((frames, bins));
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.frame_length];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        for (frame_idx, mut row) in spectrogram.rows_mut().into_iter().enumerate() {
            let start = frame_idx * self.frame_step;
            let frame = &samples[start..start + self.frame_length];

            for ((slot, &sample), &w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *slot = Complex::new(sample * w, 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (value, bin) in row.iter_mut().zip(&buffer[..bins]) {
                *value = bin.norm_sqr();
            }
        }

        Ok(spectrogram)
    }
}

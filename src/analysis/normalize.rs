// Normalization - fixed-length framing and peak scaling of the keyword window

use crate::error::AudioError;

/// Pad with trailing zeros or truncate the tail so the output has exactly `length` samples
pub fn fix_length(samples: &[f32], length: usize) -> Vec<f32> {
    let mut fixed = Vec::with_capacity(length);
    fixed.extend_from_slice(&samples[..samples.len().min(length)]);
    fixed.resize(length, 0.0);
    fixed
}

/// Zero-center and peak-scale a window into [-1, 1]
///
/// The mean is removed first, then every sample is divided by the largest
/// absolute value. A window whose centered peak is zero (digital silence or a
/// constant DC offset) has no defined scale and fails with
/// [`AudioError::SilentAudio`].
pub fn normalize(samples: &[f32]) -> Result<Vec<f32>, AudioError> {
    if samples.is_empty() {
        return Err(AudioError::SilentAudio);
    }

    let mean = (samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64) as f32;
    let centered: Vec<f32> = samples.iter().map(|&s| s - mean).collect();

    let peak = centered.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    if peak == 0.0 || !peak.is_finite() {
        return Err(AudioError::SilentAudio);
    }

    Ok(centered.into_iter().map(|s| s / peak).collect())
}

// Augmentation - mix background noise into a clip
//
// Used to simulate recordings taken in noisier rooms: a random slice of a
// longer noise recording is scaled and added sample by sample.

use rand::Rng;

use crate::error::AudioError;

/// Default gain applied to the noise slice
pub const DEFAULT_NOISE_SCALE: f32 = 0.1;

/// Add a randomly positioned slice of `noise` to `audio`
///
/// The slice start is drawn uniformly from `0..len(noise) - len(audio)`, so
/// the noise recording must be strictly longer than the clip.
///
/// # Returns
/// `audio[i] + scale * noise[start + i]` for every sample of `audio`
pub fn add_noise<R: Rng + ?Sized>(
    audio: &[f32],
    noise: &[f32],
    scale: f32,
    rng: &mut R,
) -> Result<Vec<f32>, AudioError> {
    if noise.len() <= audio.len() {
        return Err(AudioError::InsufficientAudio {
            required: audio.len() + 1,
            available: noise.len(),
        });
    }

    let start = rng.gen_range(0..noise.len() - audio.len());
    let slice = &noise[start..start + audio.len()];

    Ok(audio
        .iter()
        .zip(slice)
        .map(|(&sample, &n)| sample + scale * n)
        .collect())
}

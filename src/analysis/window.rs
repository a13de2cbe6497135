// KeywordWindowLocator - energy-based search for the spoken keyword
//
// The recording is split into consecutive, non-overlapping windows of one
// keyword duration. The window with the highest mean absolute amplitude is
// taken as the keyword. This is a heuristic stand-in for voice activity
// detection: loud background noise can win over quiet speech, and detection
// accuracy figures depend on exactly this behaviour.

use crate::error::AudioError;

/// Outcome of a window search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSelection {
    /// Sample offset of the selected window
    pub offset: usize,
    /// Mean absolute amplitude of the selected window
    pub energy: f32,
    /// Number of candidate windows that were compared
    pub candidates: usize,
}

/// Locates the highest-energy keyword window in a mono buffer
#[derive(Debug, Clone, Copy)]
pub struct KeywordWindowLocator {
    window_size: usize,
}

impl KeywordWindowLocator {
    /// Create a locator for windows of `sample_rate * word_duration_secs` samples
    pub fn new(sample_rate: u32, word_duration_secs: f32) -> Self {
        Self::with_window_size((sample_rate as f32 * word_duration_secs).round() as usize)
    }

    pub fn with_window_size(window_size: usize) -> Self {
        Self { window_size }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Pick the candidate window with maximum mean absolute amplitude
    ///
    /// Candidates start at `0, W, 2W, ...` strictly before `len - W`, so a
    /// window ending exactly at the end of the buffer is never considered
    /// unless the buffer holds a single window. Ties go to the earliest
    /// window.
    pub fn select(&self, samples: &[f32]) -> Result<WindowSelection, AudioError> {
        if self.window_size == 0 || samples.len() < self.window_size {
            return Err(AudioError::InsufficientAudio {
                required: self.window_size.max(1),
                available: samples.len(),
            });
        }

        let mut best = WindowSelection {
            offset: 0,
            energy: f32::NEG_INFINITY,
            candidates: 0,
        };

        for offset in self.candidate_offsets(samples.len()) {
            let energy = mean_abs(&samples[offset..offset + self.window_size]);
            // Strict comparison keeps the leftmost maximum
            if energy > best.energy {
                best.offset = offset;
                best.energy = energy;
            }
            best.candidates += 1;
        }

        Ok(best)
    }

    /// Select the keyword window and borrow its samples (exactly `window_size` long)
    pub fn locate<'a>(
        &self,
        samples: &'a [f32],
    ) -> Result<(WindowSelection, &'a [f32]), AudioError> {
        let selection = self.select(samples)?;
        tracing::debug!(
            "[WindowLocator] Selected offset {} of {} candidates (energy {:.5})",
            selection.offset,
            selection.candidates,
            selection.energy
        );
        let window = &samples[selection.offset..selection.offset + self.window_size];
        Ok((selection, window))
    }

    /// Start offsets of the windows compared for a buffer of `len` samples
    fn candidate_offsets(&self, len: usize) -> std::iter::StepBy<std::ops::Range<usize>> {
        let end = if len == self.window_size {
            1
        } else {
            len - self.window_size
        };
        (0..end).step_by(self.window_size)
    }
}

fn mean_abs(window: &[f32]) -> f32 {
    let sum: f64 = window.iter().map(|&s| s.abs() as f64).sum();
    (sum / window.len() as f64) as f32
}

// NoiseLevelMeter - background loudness in dBFS
//
// Formula: level = 20 × log10(rms / full_scale)
//
// Digital silence has rms = 0 and would report negative infinity. The meter
// clamps every reading to a configured floor instead, so silent rooms report
// the floor value and reports stay finite.

/// Measures loudness of a noise-only recording
#[derive(Debug, Clone, Copy)]
pub struct NoiseLevelMeter {
    full_scale: f32,
    floor_dbfs: f32,
}

impl NoiseLevelMeter {
    /// # Arguments
    /// * `full_scale` - Amplitude that maps to 0 dBFS (1.0 for float PCM)
    /// * `floor_dbfs` - Lowest value ever reported
    pub fn new(full_scale: f32, floor_dbfs: f32) -> Self {
        Self {
            full_scale,
            floor_dbfs,
        }
    }

    pub fn floor_dbfs(&self) -> f32 {
        self.floor_dbfs
    }

    /// Root-mean-square amplitude (0.0 for an empty buffer)
    pub fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_sq / samples.len() as f64).sqrt() as f32
    }

    /// Loudness of `samples` in dBFS, never below the floor
    pub fn measure(&self, samples: &[f32]) -> f32 {
        let rms = Self::rms(samples);
        if rms <= 0.0 {
            return self.floor_dbfs;
        }
        let level = 20.0 * (rms / self.full_scale).log10();
        level.max(self.floor_dbfs)
    }
}

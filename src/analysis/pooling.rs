// Pooling module - average pooling and log compression of the spectrogram
//
// Pooling uses window == stride with "same" padding: each axis of length n
// produces ceil(n / stride) outputs, the padding is split with the smaller
// half before the data, and padded cells are excluded from the average so
// edge outputs are the mean of fewer elements.

use ndarray::Array2;

use super::spectrogram::SpectrogramTensor;

/// Pooled, log-compressed spectrogram handed to the classifier
pub type FeatureMap = Array2<f32>;

/// Average-pools a spectrogram and applies `log10(x + epsilon)`
#[derive(Debug, Clone, Copy)]
pub struct PoolingCompressor {
    /// [time, frequency] window and stride
    pool: [usize; 2],
    epsilon: f32,
}

impl PoolingCompressor {
    pub fn new(pool: [usize; 2], epsilon: f32) -> Self {
        Self {
            pool: [pool[0].max(1), pool[1].max(1)],
            epsilon,
        }
    }

    /// Output shape for an input of `[frames, bins]`
    pub fn output_shape(&self, frames: usize, bins: usize) -> [usize; 2] {
        [frames.div_ceil(self.pool[0]), bins.div_ceil(self.pool[1])]
    }

    pub fn compress(&self, spectrogram: &SpectrogramTensor) -> FeatureMap {
        let (frames, bins) = spectrogram.dim();
        let time_ranges = same_ranges(frames, self.pool[0]);
        let freq_ranges = same_ranges(bins, self.pool[1]);

        Array2::from_shape_fn((time_ranges.len(), freq_ranges.len()), |(t, f)| {
            let (t0, t1) = time_ranges[t];
            let (f0, f1) = freq_ranges[f];
            let block = spectrogram.slice(ndarray::s![t0..t1, f0..f1]);
            let count = block.len().max(1) as f32;
            let mean = block.sum() / count;
            (mean + self.epsilon).log10()
        })
    }
}

/// Input ranges covered by each output position under "same" padding
fn same_ranges(len: usize, stride: usize) -> Vec<(usize, usize)> {
    let outputs = len.div_ceil(stride);
    let total_pad = ((outputs.saturating_sub(1)) * stride + stride).saturating_sub(len);
    let pad_before = total_pad / 2;

    (0..outputs)
        .map(|o| {
            let start = (o * stride).saturating_sub(pad_before);
            let end = (o * stride + stride - pad_before).min(len);
            (start, end)
        })
        .collect()
}

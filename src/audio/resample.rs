// Resampling - FFT based sample rate conversion for mono buffers

use rubato::{FftFixedIn, Resampler};

use crate::error::AudioError;

/// Input chunk size fed to the resampler
const CHUNK_SIZE: usize = 1024;

/// Sub-chunks per chunk (trades latency for FFT size)
const SUB_CHUNKS: usize = 2;

/// Resample a mono buffer from `from_rate` to `to_rate`
///
/// The resampler's intrinsic delay is trimmed so the output is aligned with
/// the input, and the result has exactly `ceil(len * to_rate / from_rate)`
/// samples.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(AudioError::Decode {
            reason: format!("cannot resample {from_rate} Hz -> {to_rate} Hz"),
        });
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let expected = (samples.len() as u64 * to_rate as u64).div_ceil(from_rate as u64) as usize;

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_SIZE,
        SUB_CHUNKS,
        1,
    )
    .map_err(|err| resample_error(&err))?;
    let delay = resampler.output_delay();

    let mut output = Vec::with_capacity(expected + delay);
    let mut position = 0;

    while position + resampler.input_frames_next() <= samples.len() {
        let needed = resampler.input_frames_next();
        let frame: &[&[f32]] = &[&samples[position..position + needed]];
        let chunk = resampler
            .process(frame, None)
            .map_err(|err| resample_error(&err))?;
        output.extend_from_slice(&chunk[0]);
        position += needed;
    }

    if position < samples.len() {
        let tail: &[&[f32]] = &[&samples[position..]];
        let chunk = resampler
            .process_partial(Some(tail), None)
            .map_err(|err| resample_error(&err))?;
        output.extend_from_slice(&chunk[0]);
    }

    // Flush the delay line
    while output.len() < expected + delay {
        let chunk = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|err| resample_error(&err))?;
        if chunk[0].is_empty() {
            break;
        }
        output.extend_from_slice(&chunk[0]);
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected, 0.0);
    Ok(output)
}

fn resample_error(err: &dyn std::error::Error) -> AudioError {
    AudioError::Decode {
        reason: format!("resampling failed: {err}"),
    }
}

// AudioLoader - decode any supported container into mono PCM at the pipeline rate
//
// Probing and decoding go through symphonia so WAV, FLAC, OGG/Vorbis, MP3 and
// MP4/AAC uploads are all accepted. Multi-channel streams are downmixed by
// averaging each frame; the result is then resampled to the target rate.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use super::resample::resample;
use super::RawAudioBuffer;
use crate::error::AudioError;

/// Decodes raw bytes into [`RawAudioBuffer`]s
#[derive(Debug, Clone, Copy)]
pub struct AudioLoader {
    target_sample_rate: u32,
}

impl AudioLoader {
    /// Create a loader that resamples everything to `target_sample_rate`
    pub fn new(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Decode and downmix, then resample to the target rate
    ///
    /// # Arguments
    /// * `bytes` - Complete encoded file contents
    /// * `hint` - Optional file extension used to speed up probing
    pub fn load(&self, bytes: &[u8], hint: Option<&str>) -> Result<RawAudioBuffer, AudioError> {
        let decoded = self.decode(bytes, hint)?;
        if decoded.sample_rate == self.target_sample_rate {
            return Ok(decoded);
        }

        let samples = resample(
            &decoded.samples,
            decoded.sample_rate,
            self.target_sample_rate,
        )?;
        tracing::debug!(
            "[AudioLoader] Resampled {} -> {} Hz ({} -> {} samples)",
            decoded.sample_rate,
            self.target_sample_rate,
            decoded.samples.len(),
            samples.len()
        );

        Ok(RawAudioBuffer::new(
            samples,
            self.target_sample_rate,
            decoded.channels,
        ))
    }

    /// Decode and downmix to mono at the native sample rate
    pub fn decode(&self, bytes: &[u8], hint: Option<&str>) -> Result<RawAudioBuffer, AudioError> {
        let source = Box::new(Cursor::new(bytes.to_vec()));
        let mss = MediaSourceStream::new(source, Default::default());

        let mut probe_hint = Hint::new();
        if let Some(ext) = hint {
            probe_hint.with_extension(ext);
        }

        let probed = get_probe()
            .format(
                &probe_hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|err| decode_error("unrecognized container", err))?;
        let mut format = probed.format;

        let (track_id, codec_params) = {
            let track = format
                .tracks()
                .iter()
                .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
                .ok_or_else(|| AudioError::Decode {
                    reason: "no audio track found".to_string(),
                })?;
            (track.id, track.codec_params.clone())
        };

        let mut decoder = get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|err| decode_error("unsupported codec", err))?;

        let mut sample_rate = codec_params.sample_rate;
        let mut channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(0);
        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        let mut mono = Vec::<f32>::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(SymphoniaError::IoError(err))
                    if err.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(err) => return Err(decode_error("failed to read packet", err)),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(reason)) => {
                    tracing::warn!("[AudioLoader] Skipping corrupt packet: {}", reason);
                    continue;
                }
                Err(err) => return Err(decode_error("failed to decode packet", err)),
            };

            let spec = *decoded.spec();
            let chan_count = spec.channels.count().max(1);
            sample_rate.get_or_insert(spec.rate);
            if channels == 0 {
                channels = chan_count as u16;
            }

            if sample_buf
                .as_ref()
                .map(|b| b.capacity() < decoded.capacity())
                .unwrap_or(true)
            {
                sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
            }
            let Some(buf) = sample_buf.as_mut() else {
                continue;
            };

            buf.copy_interleaved_ref(decoded);
            downmix_into(buf.samples(), chan_count, &mut mono);
        }

        let sample_rate = sample_rate.ok_or_else(|| AudioError::Decode {
            reason: "unknown sample rate".to_string(),
        })?;

        tracing::debug!(
            "[AudioLoader] Decoded {} frames at {} Hz ({} ch)",
            mono.len(),
            sample_rate,
            channels
        );

        Ok(RawAudioBuffer::new(mono, sample_rate, channels.max(1)))
    }
}

/// Average interleaved frames into a single channel
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels == 1 {
        out.extend_from_slice(interleaved);
        return;
    }

    out.reserve(interleaved.len() / channels);
    for frame in interleaved.chunks(channels) {
        let sum: f32 = frame.iter().copied().sum();
        out.push(sum / channels as f32);
    }
}

fn decode_error(stage: &str, err: SymphoniaError) -> AudioError {
    AudioError::Decode {
        reason: format!("{stage}: {err}"),
    }
}

/// Encode mono samples as 16-bit PCM WAV bytes
pub fn encode_pcm16_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let wav_error = |err: hound::Error| AudioError::Decode {
        reason: format!("failed to encode wav: {err}"),
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(wav_error)?;
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
            writer.write_sample(value).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)?;
    }
    Ok(cursor.into_inner())
}

/// Convert any decodable recording into canonical mono 16-bit WAV at `sample_rate`
///
/// This is the on-disk format recordings are stored in before evaluation.
pub fn convert_to_canonical_wav(
    bytes: &[u8],
    hint: Option<&str>,
    sample_rate: u32,
) -> Result<Vec<u8>, AudioError> {
    let buffer = AudioLoader::new(sample_rate).load(bytes, hint)?;
    encode_pcm16_wav(&buffer.samples, buffer.sample_rate)
}

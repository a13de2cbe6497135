// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Single source of truth for the numeric codes reported by the CLI and the
/// session evaluator.
///
/// Error code range: 1001-1004
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Input bytes could not be probed, decoded or resampled
    pub const DECODE_FAILED: i32 = 1001;

    /// Recording is too short to form one keyword window
    pub const INSUFFICIENT_AUDIO: i32 = 1002;

    /// Keyword window has zero peak amplitude after centering
    pub const SILENT_AUDIO: i32 = 1003;

    /// Pipeline configuration is inconsistent
    pub const INVALID_CONFIG: i32 = 1004;
}

/// Log an audio error with structured context
///
/// This function logs audio errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=FeaturePipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover decoding and every DSP stage between the raw bytes and
/// the feature map. All of them are per-recording and recoverable.
///
/// Error code ranges: 1001-1004
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Malformed or unsupported container/codec
    Decode { reason: String },

    /// Fewer samples than one analysis window
    InsufficientAudio { required: usize, available: usize },

    /// Peak normalization would divide by zero
    SilentAudio,

    /// Configuration values cannot produce a valid feature map
    InvalidConfig { reason: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::Decode { .. } => AudioErrorCodes::DECODE_FAILED,
            AudioError::InsufficientAudio { .. } => AudioErrorCodes::INSUFFICIENT_AUDIO,
            AudioError::SilentAudio => AudioErrorCodes::SILENT_AUDIO,
            AudioError::InvalidConfig { .. } => AudioErrorCodes::INVALID_CONFIG,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::Decode { reason } => format!("Failed to decode audio: {}", reason),
            AudioError::InsufficientAudio {
                required,
                available,
            } => format!(
                "Insufficient audio: need {} samples, got {}",
                required, available
            ),
            AudioError::SilentAudio => {
                "Silent audio: peak amplitude is zero, cannot normalize".to_string()
            }
            AudioError::InvalidConfig { reason } => {
                format!("Invalid pipeline configuration: {}", reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

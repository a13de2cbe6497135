// Error types for the keyword study pipeline
//
// This module defines custom error types for decoding, DSP and inference
// operations, providing structured error handling with numeric error codes.

mod audio;
mod inference;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use inference::{log_inference_error, InferenceError, InferenceErrorCodes};

use std::fmt;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent reporting in the CLI and
/// session reports.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Any failure surfaced by the pipeline facade
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Audio(AudioError),
    Inference(InferenceError),
}

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::Audio(err) => err.code(),
            PipelineError::Inference(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            PipelineError::Audio(err) => err.message(),
            PipelineError::Inference(err) => err.message(),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Audio(err) => fmt::Display::fmt(err, f),
            PipelineError::Inference(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Audio(err) => Some(err),
            PipelineError::Inference(err) => Some(err),
        }
    }
}

impl From<AudioError> for PipelineError {
    fn from(err: AudioError) -> Self {
        PipelineError::Audio(err)
    }
}

impl From<InferenceError> for PipelineError {
    fn from(err: InferenceError) -> Self {
        PipelineError::Inference(err)
    }
}

/// Log a pipeline error through the matching component logger
pub fn log_pipeline_error(err: &PipelineError, context: &str) {
    match err {
        PipelineError::Audio(err) => log_audio_error(err, context),
        PipelineError::Inference(err) => log_inference_error(err, context),
    }
}

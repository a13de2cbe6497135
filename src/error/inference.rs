// Inference error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Inference error code constants
///
/// Error code range: 2001-2005
pub struct InferenceErrorCodes {}

impl InferenceErrorCodes {
    /// Model artifact missing or corrupt at startup
    pub const MODEL_LOAD_FAILED: i32 = 2001;

    /// Feature map shape does not match the model input
    pub const SHAPE_MISMATCH: i32 = 2002;

    /// Model produced something other than one probability
    pub const INVALID_OUTPUT: i32 = 2003;

    /// Runtime failure while invoking the model
    pub const RUNTIME_FAILURE: i32 = 2004;

    /// A model instance mutex was poisoned
    pub const LOCK_POISONED: i32 = 2005;
}

/// Log an inference error with structured context
pub fn log_inference_error(err: &InferenceError, context: &str) {
    error!(
        "Inference error in {}: code={}, component=InferenceEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Inference-related errors
///
/// `ModelLoad` is fatal at startup: no engine exists without a loaded model.
/// The remaining variants are per-recording.
///
/// Error code ranges: 2001-2005
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// Artifact could not be read or parsed
    ModelLoad { path: String, reason: String },

    /// Input dims differ from what the model declares
    ShapeMismatch {
        expected: Vec<Option<usize>>,
        actual: Vec<usize>,
    },

    /// Output was empty, multi-valued, non-finite or outside [0, 1]
    InvalidOutput { reason: String },

    /// Runtime returned an error during invocation
    Runtime { reason: String },

    /// Instance mutex was poisoned by a panicking caller
    LockPoisoned,
}

impl ErrorCode for InferenceError {
    fn code(&self) -> i32 {
        match self {
            InferenceError::ModelLoad { .. } => InferenceErrorCodes::MODEL_LOAD_FAILED,
            InferenceError::ShapeMismatch { .. } => InferenceErrorCodes::SHAPE_MISMATCH,
            InferenceError::InvalidOutput { .. } => InferenceErrorCodes::INVALID_OUTPUT,
            InferenceError::Runtime { .. } => InferenceErrorCodes::RUNTIME_FAILURE,
            InferenceError::LockPoisoned => InferenceErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            InferenceError::ModelLoad { path, reason } => {
                format!("Failed to load model {}: {}", path, reason)
            }
            InferenceError::ShapeMismatch { expected, actual } => {
                format!(
                    "Feature shape mismatch: model expects {}, got {:?}",
                    format_dims(expected),
                    actual
                )
            }
            InferenceError::InvalidOutput { reason } => {
                format!("Invalid model output: {}", reason)
            }
            InferenceError::Runtime { reason } => format!("Inference failed: {}", reason),
            InferenceError::LockPoisoned => "Model instance lock poisoned".to_string(),
        }
    }
}

fn format_dims(dims: &[Option<usize>]) -> String {
    let parts: Vec<String> = dims
        .iter()
        .map(|dim| match dim {
            Some(size) => size.to_string(),
            None => "?".to_string(),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InferenceError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for InferenceError {}

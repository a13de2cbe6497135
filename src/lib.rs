// Keyword Study Core - feature extraction and keyword detection
// Locates the spoken keyword in a recording, turns it into a pooled
// log-power spectrogram and scores it with a quantized classifier.

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod inference;
pub mod pipeline;
pub mod session;

// Re-exports for convenience
pub use config::PipelineConfig;
pub use error::{AudioError, ErrorCode, InferenceError, PipelineError};
pub use inference::{Classifier, DetectionResult, InferenceEngine};
pub use pipeline::KeywordPipeline;

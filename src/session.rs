//! Session evaluation over a directory of participant recordings.
//!
//! Recordings are named `<experiment>_<index>.wav`, where the experiment id is
//! the microphone distance (`50cm`, `1m`, `3m`, `5m`). The background noise
//! recording is always `noise_0.wav`. Each recording is evaluated on its own;
//! one failing file is reported in its row and does not abort the session.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::pipeline::KeywordPipeline;

/// File holding the silence/noise recording of a session
pub const NOISE_RECORDING: &str = "noise_0.wav";

/// Per-recording outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordingOutcome {
    Detected { probability: f32, detected: bool },
    Failed { code: i32, message: String },
}

/// One row of the session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingResult {
    pub file: String,
    pub distance: String,
    pub noise_level_dbfs: Option<f32>,
    pub outcome: RecordingOutcome,
}

/// Evaluation of every recording in one session directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub noise_level_dbfs: Option<f32>,
    pub recordings: Vec<RecordingResult>,
}

impl SessionReport {
    /// Recordings that produced a positive detection
    pub fn detected_count(&self) -> usize {
        self.recordings
            .iter()
            .filter(|row| matches!(row.outcome, RecordingOutcome::Detected { detected: true, .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.recordings
            .iter()
            .filter(|row| matches!(row.outcome, RecordingOutcome::Failed { .. }))
            .count()
    }
}

/// Distance label encoded in a recording file name (`3m_2.wav` -> `3m`)
pub fn distance_label(file_name: &str) -> &str {
    let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);
    stem.split('_').next().unwrap_or(stem)
}

/// Evaluate all `.wav` recordings in `dir`
pub fn evaluate_session(pipeline: &KeywordPipeline, dir: &Path) -> Result<SessionReport> {
    let noise_path = dir.join(NOISE_RECORDING);
    let noise_level_dbfs = if noise_path.is_file() {
        let bytes =
            fs::read(&noise_path).with_context(|| format!("reading {}", noise_path.display()))?;
        match pipeline.measure_noise_level(&bytes, Some("wav")) {
            Ok(level) => Some(level),
            Err(err) => {
                tracing::warn!("[Session] Noise recording unusable: {}", err.message());
                None
            }
        }
    } else {
        tracing::warn!("[Session] No {} in {}", NOISE_RECORDING, dir.display());
        None
    };

    let mut files: Vec<String> = fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.to_ascii_lowercase().ends_with(".wav") && name != NOISE_RECORDING)
        .collect();
    files.sort();

    let mut recordings = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file);
        let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;

        let outcome = match pipeline.extract_and_detect(&bytes, Some("wav")) {
            Ok(result) => RecordingOutcome::Detected {
                probability: result.probability,
                detected: result.detected,
            },
            Err(err) => RecordingOutcome::Failed {
                code: err.code(),
                message: err.message(),
            },
        };

        recordings.push(RecordingResult {
            distance: distance_label(&file).to_string(),
            file,
            noise_level_dbfs,
            outcome,
        });
    }

    tracing::info!(
        "[Session] Evaluated {} recordings in {}",
        recordings.len(),
        dir.display()
    );

    Ok(SessionReport {
        noise_level_dbfs,
        recordings,
    })
}

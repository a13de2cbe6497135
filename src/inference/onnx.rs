// ONNX Runtime backed classifier
//
// The keyword model ships as a quantized ONNX artifact with a single float32
// input of shape [1, frames, bins, 1] and a single scalar output.

use std::path::Path;

use anyhow::Context;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{Tensor, ValueType};

use super::Classifier;
use crate::error::InferenceError;

/// One loaded ONNX session
pub struct OnnxClassifier {
    session: Session,
    input_shape: Vec<Option<usize>>,
}

impl OnnxClassifier {
    /// Load the artifact at `model_path`
    ///
    /// Fails with [`InferenceError::ModelLoad`] if the file is missing, is not
    /// a valid model, or does not declare a tensor input.
    pub fn load(model_path: &Path) -> Result<Self, InferenceError> {
        let load_error = |reason: String| InferenceError::ModelLoad {
            path: model_path.display().to_string(),
            reason,
        };

        if !model_path.is_file() {
            return Err(load_error("file not found".to_string()));
        }

        let session = build_session(model_path).map_err(|err| load_error(format!("{err:#}")))?;

        if session.inputs.len() != 1 || session.outputs.len() != 1 {
            return Err(load_error(format!(
                "expected exactly one input and one output, found {} and {}",
                session.inputs.len(),
                session.outputs.len()
            )));
        }

        let input_shape = match &session.inputs[0].input_type {
            ValueType::Tensor { shape, .. } => shape
                .iter()
                .map(|&dim| usize::try_from(dim).ok())
                .collect::<Vec<_>>(),
            other => return Err(load_error(format!("input is not a tensor: {other:?}"))),
        };

        tracing::info!(
            "[OnnxClassifier] Loaded {} (input {:?})",
            model_path.display(),
            input_shape
        );

        Ok(Self {
            session,
            input_shape,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn input_shape(&self) -> &[Option<usize>] {
        &self.input_shape
    }

    fn predict(&mut self, input: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        run_session(&mut self.session, input).map_err(|err| InferenceError::Runtime {
            reason: format!("{err:#}"),
        })
    }
}

fn build_session(model_path: &Path) -> anyhow::Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(1)?
        .with_inter_threads(1)?
        .commit_from_file(model_path)
        .context("Failed to load keyword classifier")?;
    Ok(session)
}

fn run_session(session: &mut Session, input: Array4<f32>) -> anyhow::Result<Vec<f32>> {
    let tensor = Tensor::from_array(input)?;
    let outputs = session.run(ort::inputs![tensor])?;

    let output: ndarray::ArrayViewD<f32> = outputs[0]
        .try_extract_array()
        .context("Failed to extract classifier output")?;

    Ok(output.iter().copied().collect())
}

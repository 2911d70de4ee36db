//! In-process ONNX Runtime backend.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use ndarray::ArrayView4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{Error, Result};

use super::backend::{LoadedModel, Logit, ModelBackend};

/// Executes the exported classifier with ONNX Runtime on the CPU.
#[derive(Debug, Clone, Default)]
pub struct OnnxBackend {
    intra_threads: usize,
}

impl OnnxBackend {
    /// Create a backend. `intra_threads == 0` leaves the choice to ONNX Runtime.
    #[must_use]
    pub const fn new(intra_threads: usize) -> Self {
        Self { intra_threads }
    }

    fn build_session(&self, path: &Path) -> std::result::Result<Session, ort::Error> {
        let mut builder =
            Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;
        if self.intra_threads > 0 {
            builder = builder.with_intra_threads(self.intra_threads)?;
        }
        builder.commit_from_file(path)
    }
}

impl ModelBackend for OnnxBackend {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn load(&self, path: &Path) -> Result<Box<dyn LoadedModel>> {
        let session = self.build_session(path).map_err(|source| Error::ModelLoad {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;

        Ok(Box::new(OnnxModel {
            session: Mutex::new(session),
        }))
    }
}

/// `Session::run` takes `&mut self`, so forward passes are serialized: at
/// most one inference is in flight per loaded model.
struct OnnxModel {
    session: Mutex<Session>,
}

impl LoadedModel for OnnxModel {
    fn forward(&self, input: ArrayView4<'_, f32>) -> Result<Logit> {
        let input_value =
            Tensor::from_array(input.to_owned()).map_err(|source| Error::Inference { source })?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);

        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|source| Error::Inference { source })?;

        // Get first output
        let output = outputs
            .values()
            .next()
            .ok_or_else(|| Error::ShapeMismatch {
                expected: "logit output".to_string(),
                actual: "no output".to_string(),
            })?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|source| Error::Inference { source })?;

        match data {
            [logit] => Ok(*logit),
            _ => Err(Error::ShapeMismatch {
                expected: "a single logit".to_string(),
                actual: format!("{shape:?}"),
            }),
        }
    }
}

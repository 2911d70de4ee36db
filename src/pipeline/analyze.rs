//! Orchestration of preprocessing, inference and the decision step.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{BackendConfig, ModelConfig};
use crate::error::Result;
use crate::image;
use crate::model::{CandidatePaths, ModelBackend, ModelExecutor, OnnxBackend, SubprocessBackend};

use super::decision::{decide, ClassificationResult};

/// The single entry point for classifying an uploaded image.
///
/// Cheap to clone; clones share the model cache.
#[derive(Clone)]
pub struct InferencePipeline {
    executor: Arc<ModelExecutor>,
}

impl InferencePipeline {
    /// Wrap an existing executor.
    #[must_use]
    pub fn new(executor: ModelExecutor) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }

    /// Build the executor described by `config`. The model itself is loaded
    /// on first use.
    #[must_use]
    pub fn from_config(config: &ModelConfig) -> Self {
        let locator = if config.candidates.is_empty() {
            CandidatePaths::defaults()
        } else {
            CandidatePaths::new(config.candidates.clone())
        };

        let backend: Box<dyn ModelBackend> = match &config.backend {
            BackendConfig::Onnx => Box::new(OnnxBackend::new(config.intra_threads)),
            BackendConfig::Subprocess { program, args } => {
                Box::new(SubprocessBackend::new(program.clone(), args.clone()))
            }
        };

        Self::new(ModelExecutor::new(Box::new(locator), backend))
    }

    /// The underlying model executor.
    #[must_use]
    pub fn executor(&self) -> &ModelExecutor {
        &self.executor
    }

    /// Classify one encoded image.
    ///
    /// Runs preprocessing, makes sure the model is loaded, runs a forward
    /// pass and applies the decision threshold. Input problems are reported
    /// before the model is touched.
    ///
    /// # Errors
    ///
    /// Propagates the failing stage's error unchanged: [`crate::Error::EmptyInput`],
    /// [`crate::Error::Decode`], [`crate::Error::ModelNotFound`] or an
    /// inference failure.
    pub fn analyze(&self, image_bytes: &[u8]) -> Result<ClassificationResult> {
        let started = Instant::now();

        let tensor = image::preprocess(image_bytes)?;
        tracing::debug!("preprocessing took {:.2?}", started.elapsed());

        self.executor.ensure_loaded()?;
        let logit = self.executor.run(&tensor)?;

        let result = decide(logit);
        tracing::debug!(
            logit,
            prediction = %result.prediction,
            confidence = result.confidence,
            "analysis finished in {:.2?}",
            started.elapsed()
        );

        Ok(result)
    }
}

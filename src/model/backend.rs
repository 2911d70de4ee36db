//! The execution capability the executor is written against.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::ArrayView4;

use crate::error::Result;

/// Raw, unnormalized classifier output for the "real" class.
pub type Logit = f32;

/// A runtime able to turn a model artifact into something executable.
pub trait ModelBackend: Send + Sync {
    /// Short identifier used in logs and health reports.
    fn name(&self) -> &'static str;

    /// Load the artifact at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be loaded by this backend.
    fn load(&self, path: &Path) -> Result<Box<dyn LoadedModel>>;
}

/// A loaded model, ready for forward passes.
pub trait LoadedModel: Send + Sync {
    /// Run one forward pass over an NCHW batch of exactly one image.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or produces malformed output.
    fn forward(&self, input: ArrayView4<'_, f32>) -> Result<Logit>;
}

/// Shared, read-only handle to a loaded model.
#[derive(Clone)]
pub struct ModelHandle {
    path: PathBuf,
    model: Arc<dyn LoadedModel>,
}

impl ModelHandle {
    pub(crate) fn new(path: PathBuf, model: Box<dyn LoadedModel>) -> Self {
        Self {
            path,
            model: Arc::from(model),
        }
    }

    /// Where the artifact was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn forward(&self, input: ArrayView4<'_, f32>) -> Result<Logit> {
        self.model.forward(input)
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

//! Process-wide owner of the loaded classifier.

use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Instant;

use ndarray::Axis;

use crate::error::{Error, Result};
use crate::image::{NormalizedTensor, IMG_SIZE, RGB_CHANNELS};

use super::backend::{Logit, ModelBackend, ModelHandle};
use super::locator::ModelLocator;

/// Locates, loads and runs the classifier.
///
/// The model is loaded lazily on the first [`ensure_loaded`](Self::ensure_loaded)
/// and cached for the lifetime of the executor. Concurrent first callers
/// block on a single load; nobody loads twice.
pub struct ModelExecutor {
    locator: Box<dyn ModelLocator>,
    backend: Box<dyn ModelBackend>,
    handle: OnceLock<ModelHandle>,
    init: Mutex<()>,
}

impl ModelExecutor {
    /// Create an executor. Nothing is loaded until first use.
    #[must_use]
    pub fn new(locator: Box<dyn ModelLocator>, backend: Box<dyn ModelBackend>) -> Self {
        Self {
            locator,
            backend,
            handle: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Name of the execution backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Whether a model has been loaded into the cache.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.handle.get().is_some()
    }

    /// Whether an artifact is present at one of the candidate locations.
    /// Does not load anything.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.is_loaded() || self.locator.locate().is_ok()
    }

    /// Return the cached handle, loading the model on first call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotFound`] when no candidate location holds the
    /// artifact, or [`Error::ModelLoad`] when the backend rejects it. A failed
    /// load is not cached; the next call tries again.
    pub fn ensure_loaded(&self) -> Result<ModelHandle> {
        if let Some(handle) = self.handle.get() {
            return Ok(handle.clone());
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);

        // Another caller may have finished loading while we waited.
        if let Some(handle) = self.handle.get() {
            return Ok(handle.clone());
        }

        let path = self.locator.locate()?;
        tracing::info!(
            "Loading model from {} ({} backend)",
            path.display(),
            self.backend.name()
        );

        let started = Instant::now();
        let model = self.backend.load(&path)?;
        let handle = ModelHandle::new(path, model);

        tracing::info!("Model loaded in {:.2?}", started.elapsed());

        Ok(self.handle.get_or_init(|| handle).clone())
    }

    /// Run one forward pass on a `[3, 224, 224]` tensor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotLoaded`] before a successful
    /// [`ensure_loaded`](Self::ensure_loaded), [`Error::ShapeMismatch`] for a
    /// tensor of the wrong shape, and any backend failure unchanged.
    pub fn run(&self, tensor: &NormalizedTensor) -> Result<Logit> {
        let handle = self.handle.get().ok_or(Error::ModelNotLoaded)?;

        let size = IMG_SIZE as usize;
        if tensor.shape() != [RGB_CHANNELS, size, size] {
            return Err(Error::ShapeMismatch {
                expected: format!("[1, {RGB_CHANNELS}, {size}, {size}]"),
                actual: format!("[1, {}]", join_dims(tensor.shape())),
            });
        }

        // Batch of one; this pipeline never batches.
        let batch = tensor.view().insert_axis(Axis(0));

        let started = Instant::now();
        let logit = handle.forward(batch)?;
        tracing::debug!("forward pass took {:.2?}", started.elapsed());

        if !logit.is_finite() {
            return Err(Error::Backend {
                backend: self.backend.name(),
                reason: format!("non-finite logit {logit}"),
            });
        }

        Ok(logit)
    }
}

fn join_dims(dims: &[usize]) -> String {
    dims.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use ndarray::{Array3, ArrayView4};

    use super::*;
    use crate::model::{CandidatePaths, LoadedModel};

    struct Fixed {
        logit: f32,
        loads: Arc<AtomicUsize>,
    }

    struct FixedModel(f32);

    impl LoadedModel for FixedModel {
        fn forward(&self, input: ArrayView4<'_, f32>) -> Result<Logit> {
            assert_eq!(input.shape(), &[1, 3, 224, 224]);
            Ok(self.0)
        }
    }

    impl ModelBackend for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn load(&self, _path: &Path) -> Result<Box<dyn LoadedModel>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FixedModel(self.logit)))
        }
    }

    fn executor(logit: f32) -> (tempfile::NamedTempFile, Arc<AtomicUsize>, ModelExecutor) {
        let artifact = tempfile::NamedTempFile::new().unwrap();
        let loads = Arc::new(AtomicUsize::new(0));
        let exec = ModelExecutor::new(
            Box::new(CandidatePaths::new(vec![artifact.path().to_path_buf()])),
            Box::new(Fixed {
                logit,
                loads: Arc::clone(&loads),
            }),
        );
        (artifact, loads, exec)
    }

    fn input() -> NormalizedTensor {
        Array3::zeros((3, 224, 224))
    }

    #[test]
    fn test_run_before_load() {
        let (_artifact, loads, exec) = executor(1.0);

        assert!(matches!(exec.run(&input()), Err(Error::ModelNotLoaded)));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_load_is_cached() {
        let (artifact, loads, exec) = executor(1.0);

        let first = exec.ensure_loaded().unwrap();
        let second = exec.ensure_loaded().unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(first.path(), artifact.path());
        assert_eq!(second.path(), artifact.path());
        assert!(exec.is_loaded());
    }

    #[test]
    fn test_run_returns_logit() {
        let (_artifact, _loads, exec) = executor(-0.75);
        exec.ensure_loaded().unwrap();

        assert!((exec.run(&input()).unwrap() + 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_wrong_shape() {
        let (_artifact, _loads, exec) = executor(1.0);
        exec.ensure_loaded().unwrap();

        let result = exec.run(&Array3::zeros((3, 100, 224)));
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_non_finite_logit() {
        let (_artifact, _loads, exec) = executor(f32::NAN);
        exec.ensure_loaded().unwrap();

        assert!(matches!(exec.run(&input()), Err(Error::Backend { .. })));
    }

    #[test]
    fn test_missing_artifact_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        let loads = Arc::new(AtomicUsize::new(0));
        let exec = ModelExecutor::new(
            Box::new(CandidatePaths::new(vec![path.clone()])),
            Box::new(Fixed {
                logit: 0.0,
                loads: Arc::clone(&loads),
            }),
        );

        assert!(!exec.is_available());
        assert!(matches!(exec.ensure_loaded(), Err(Error::ModelNotFound { .. })));

        // Provisioning the artifact later is picked up on the next call.
        std::fs::write(&path, b"weights").unwrap();
        assert!(exec.is_available());
        assert_eq!(exec.ensure_loaded().unwrap().path(), PathBuf::from(&path));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }
}

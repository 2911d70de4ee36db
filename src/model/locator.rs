//! Resolution of the model artifact from an ordered list of locations.

use std::fs::File;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// File name the export script writes the classifier to.
pub const MODEL_FILENAME: &str = "model.onnx";

/// Something that can point at the model artifact.
pub trait ModelLocator: Send + Sync {
    /// Candidate locations, in priority order.
    fn candidates(&self) -> Vec<PathBuf>;

    /// Return the first candidate that is a readable file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotFound`] listing every candidate when none resolve.
    fn locate(&self) -> Result<PathBuf> {
        let searched = self.candidates();

        for path in &searched {
            if !path.is_file() {
                continue;
            }
            match File::open(path) {
                Ok(_) => return Ok(path.clone()),
                Err(err) => {
                    tracing::warn!("model candidate {} is not readable: {err}", path.display());
                }
            }
        }

        Err(Error::ModelNotFound { searched })
    }
}

/// A fixed, ordered list of filesystem paths.
#[derive(Debug, Clone, Default)]
pub struct CandidatePaths {
    paths: Vec<PathBuf>,
}

impl CandidatePaths {
    /// Create a locator over explicit paths.
    #[must_use]
    pub const fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// The locations deployments usually put the artifact at.
    #[must_use]
    pub fn defaults() -> Self {
        Self::new(default_candidates())
    }
}

impl ModelLocator for CandidatePaths {
    fn candidates(&self) -> Vec<PathBuf> {
        self.paths.clone()
    }
}

/// Default search order:
/// - `./public/model.onnx`
/// - `../public/model.onnx`
/// - `./model.onnx`
/// - `<data dir>/fake-image-detector/model.onnx` where the platform has one
///   (`~/.local/share` on Linux, `%APPDATA%` on Windows,
///   `~/Library/Application Support` on macOS)
#[must_use]
pub fn default_candidates() -> Vec<PathBuf> {
    let cwd = PathBuf::from(".");
    let mut paths = vec![
        cwd.join("public").join(MODEL_FILENAME),
        cwd.join("..").join("public").join(MODEL_FILENAME),
        cwd.join(MODEL_FILENAME),
    ];

    if let Some(data) = dirs::data_dir() {
        paths.push(data.join("fake-image-detector").join(MODEL_FILENAME));
    }

    paths
}

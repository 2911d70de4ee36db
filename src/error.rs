//! Error types for the detector.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the fake-image-detector library.
#[derive(Error, Debug)]
pub enum Error {
    /// The uploaded buffer contained no bytes.
    #[error("image buffer is empty")]
    EmptyInput,

    /// The bytes could not be decoded as an image.
    #[error("could not decode image: {source}")]
    Decode {
        #[source]
        source: image::ImageError,
    },

    /// None of the candidate locations held a readable model artifact.
    #[error("model artifact not found (searched: {})", display_paths(searched))]
    ModelNotFound { searched: Vec<PathBuf> },

    /// The artifact exists but the backend refused to load it.
    #[error("failed to load model from {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    /// `run` was called before the model finished loading.
    #[error("model has not been loaded")]
    ModelNotLoaded,

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// ONNX Runtime failed during execution.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// A non-ONNX execution backend failed.
    #[error("{backend} backend failed: {reason}")]
    Backend {
        backend: &'static str,
        reason: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Configuration file is not valid JSON for [`crate::Config`].
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`], used by callers that map failures
/// onto user-facing responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EmptyInput,
    Decode,
    ModelNotFound,
    Inference,
    Configuration,
    Io,
}

impl ErrorKind {
    /// True when the failure was caused by the submitted input rather than
    /// by the model or the host.
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        matches!(self, Self::EmptyInput | Self::Decode)
    }
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput => ErrorKind::EmptyInput,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::ModelNotFound { .. } => ErrorKind::ModelNotFound,
            Self::ModelLoad { .. }
            | Self::ModelNotLoaded
            | Self::ShapeMismatch { .. }
            | Self::Inference { .. }
            | Self::Backend { .. } => ErrorKind::Inference,
            Self::InvalidParameter { .. } | Self::ConfigParse { .. } => ErrorKind::Configuration,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no candidates configured".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for detector operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_kinds() {
        assert!(Error::EmptyInput.kind().is_client_error());
        assert!(!Error::ModelNotLoaded.kind().is_client_error());
        assert!(!Error::ModelNotFound { searched: vec![] }.kind().is_client_error());
    }

    #[test]
    fn test_model_not_found_lists_paths() {
        let err = Error::ModelNotFound {
            searched: vec![PathBuf::from("a/model.onnx"), PathBuf::from("b/model.onnx")],
        };
        let msg = err.to_string();
        assert!(msg.contains("a/model.onnx, b/model.onnx"), "{msg}");
    }
}

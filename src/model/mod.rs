//! Model location, loading and execution.

mod backend;
mod executor;
mod locator;
mod onnx;
mod subprocess;

pub use backend::{LoadedModel, Logit, ModelBackend, ModelHandle};
pub use executor::ModelExecutor;
pub use locator::{default_candidates, CandidatePaths, ModelLocator, MODEL_FILENAME};
pub use onnx::OnnxBackend;
pub use subprocess::SubprocessBackend;

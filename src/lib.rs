//! # fake-image-detector
//!
//! Classifies images as real photographs or generated/manipulated fakes with
//! a fine-tuned ResNet-50 exported to ONNX.
//!
//! The pipeline is deterministic: the upload is decoded, cover-resized to
//! 224x224, normalized with ImageNet statistics into a planar RGB tensor,
//! run through the classifier once, and the resulting logit is turned into a
//! label with a sigmoid and a fixed 0.5 threshold.
//!
//! ## Example
//!
//! ```no_run
//! use fake_image_detector::{Config, InferencePipeline};
//!
//! # fn main() -> fake_image_detector::Result<()> {
//! let config = Config::default();
//! let pipeline = InferencePipeline::from_config(&config.model);
//!
//! let bytes = std::fs::read("photo.jpg")?;
//! let result = pipeline.analyze(&bytes)?;
//! println!("{} ({:.1}%)", result.prediction, result.confidence * 100.0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod image;
pub mod model;
pub mod pipeline;
pub mod server;

pub use config::{BackendConfig, Config, ModelConfig, ServerConfig};
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{ClassificationResult, InferencePipeline, Prediction};

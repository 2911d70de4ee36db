//! End-to-end real/fake classification.

mod analyze;
mod decision;

pub use analyze::InferencePipeline;
pub use decision::{decide, sigmoid, ClassificationResult, Prediction, DECISION_THRESHOLD};

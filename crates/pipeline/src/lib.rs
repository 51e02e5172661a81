//! Search pipeline orchestration.
//!
//! Sequences one request through validation, classification, registry queries,
//! optional logo analysis and visual comparison, the legal narrative, and the
//! final score. Image steps degrade instead of failing the request.

mod classifier;
mod config;
mod error;
mod orchestrator;
mod stage;
mod validate;

pub use classifier::GenerativeClassifier;
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use orchestrator::Pipeline;
pub use stage::{PipelineRun, PipelineStage};
pub use validate::{validate, ValidatedRequest};

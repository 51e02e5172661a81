//! Nice classification of product and service descriptions.
//!
//! - `Taxonomy`: the static 45-class Nice document
//! - `LexicalIndex`: deterministic token-overlap classifier built from the taxonomy
//! - `Classifier`: strategy trait shared with the AI-assisted classifier
//! - `FallbackClassifier`: tries one strategy, falls back to another

mod index;
mod strategy;
mod taxonomy;

pub use index::LexicalIndex;
pub use strategy::{sanitize_codes, Classified, Classifier, FallbackClassifier};
pub use taxonomy::{NiceClassEntry, Taxonomy};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Invalid taxonomy document: {0}")]
    Taxonomy(String),
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),
}

use std::future::Future;

use brandcheck_model::is_valid_class;
use tracing::{debug, warn};

use crate::{ClassifyError, LexicalIndex};

/// Classes produced by a classification strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub codes: Vec<u16>,
    /// Name of the strategy that produced `codes`
    pub strategy: &'static str,
}

/// A way of mapping a free-text description to Nice classes.
pub trait Classifier: Send + Sync {
    /// Classify a product/service description.
    ///
    /// An empty `codes` list means the strategy could not classify the text.
    fn classify(
        &self,
        description: &str,
    ) -> impl Future<Output = Result<Classified, ClassifyError>> + Send;

    /// Strategy name for logging and response metadata.
    fn name(&self) -> &'static str;
}

impl Classifier for LexicalIndex {
    fn classify(
        &self,
        description: &str,
    ) -> impl Future<Output = Result<Classified, ClassifyError>> + Send {
        let codes = LexicalIndex::classify(self, description);
        std::future::ready(Ok(Classified {
            codes,
            strategy: "lexical",
        }))
    }

    fn name(&self) -> &'static str {
        "lexical"
    }
}

/// Tries `primary`, and uses `secondary` when it fails or finds nothing.
#[derive(Debug, Clone)]
pub struct FallbackClassifier<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackClassifier<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: Classifier, S: Classifier> Classifier for FallbackClassifier<P, S> {
    async fn classify(&self, description: &str) -> Result<Classified, ClassifyError> {
        match self.primary.classify(description).await {
            Ok(classified) if !classified.codes.is_empty() => {
                debug!(strategy = classified.strategy, classes = ?classified.codes, "Classified");
                return Ok(classified);
            }
            Ok(_) => {
                warn!(
                    strategy = self.primary.name(),
                    fallback = self.secondary.name(),
                    "Primary classifier found no classes, falling back"
                );
            }
            Err(e) => {
                warn!(
                    strategy = self.primary.name(),
                    fallback = self.secondary.name(),
                    error = %e,
                    "Primary classifier failed, falling back"
                );
            }
        }

        self.secondary.classify(description).await
    }

    fn name(&self) -> &'static str {
        self.primary.name()
    }
}

/// Keep valid Nice classes (1-45), dropping duplicates while preserving order.
pub fn sanitize_codes(codes: impl IntoIterator<Item = u16>) -> Vec<u16> {
    let mut out = Vec::new();
    for code in codes {
        if is_valid_class(code) && !out.contains(&code) {
            out.push(code);
        }
    }
    out
}

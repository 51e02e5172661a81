use brandcheck_classify::{sanitize_codes, Classified, Classifier, ClassifyError, Taxonomy};
use brandcheck_explain::{classification_prompt, parse_class_list};
use brandcheck_generation::{GenerationRequest, ModelTier, TextGenerator};
use tracing::debug;

/// AI-assisted classifier: asks the lower model tier for Nice classes,
/// grounding the prompt on the taxonomy.
pub struct GenerativeClassifier<G> {
    generator: G,
    knowledge_base: String,
}

impl<G> GenerativeClassifier<G> {
    pub fn new(generator: G, taxonomy: &Taxonomy) -> Self {
        Self {
            generator,
            knowledge_base: taxonomy.knowledge_base(),
        }
    }
}

impl<G: TextGenerator> Classifier for GenerativeClassifier<G> {
    async fn classify(&self, description: &str) -> Result<Classified, ClassifyError> {
        let request = GenerationRequest::new(
            classification_prompt(&self.knowledge_base, description),
            ModelTier::Flash,
        );
        let generation = self
            .generator
            .generate(&request)
            .await
            .map_err(|e| ClassifyError::Unavailable(e.to_string()))?;

        let codes = sanitize_codes(parse_class_list(&generation.text));
        debug!(model = %generation.model, classes = ?codes, "Generative classification");
        Ok(Classified {
            codes,
            strategy: "generative",
        })
    }

    fn name(&self) -> &'static str {
        "generative"
    }
}

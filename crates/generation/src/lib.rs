//! Text and vision generation collaborator.
//!
//! Provides the `TextGenerator` trait, a Gemini REST implementation, and the
//! `CapabilityLadder` used to downgrade from the higher to the lower model tier
//! when the higher tier's quota is exhausted.

mod gemini;
mod ladder;

pub use gemini::{GeminiClient, GeminiConfig};
pub use ladder::CapabilityLadder;

use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Errors from generation calls.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation quota exhausted")]
    QuotaExhausted,

    #[error("Generation service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid or blocked generation response: {0}")]
    InvalidResponse(String),

    #[error("Generation client misconfigured: {0}")]
    Config(String),
}

/// Model capability tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Higher capability, used for the legal narrative
    Pro,
    /// Lower capability, used for classification and image work
    Flash,
}

/// An image passed inline with a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

/// A single prompt to the generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub tier: ModelTier,
    pub images: Vec<InlineImage>,
    /// JSON schema the response must follow, when structured output is wanted
    pub response_schema: Option<serde_json::Value>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, tier: ModelTier) -> Self {
        Self {
            prompt: prompt.into(),
            tier,
            images: Vec::new(),
            response_schema: None,
        }
    }

    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.images.push(image);
        self
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn at_tier(&self, tier: ModelTier) -> Self {
        Self {
            tier,
            ..self.clone()
        }
    }
}

/// Generated text and the model that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub model: String,
}

/// Prompt-in, text-out generation service.
pub trait TextGenerator: Send + Sync {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<Generation, GenerationError>> + Send;
}

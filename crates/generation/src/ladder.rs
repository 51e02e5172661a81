use tracing::warn;

use crate::{Generation, GenerationError, GenerationRequest, ModelTier, TextGenerator};

/// Ordered model tiers, most capable first.
///
/// A request starts at its own tier and moves one rung down only when the
/// current tier reports `QuotaExhausted`. Every other error is returned as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityLadder {
    tiers: Vec<ModelTier>,
}

impl Default for CapabilityLadder {
    fn default() -> Self {
        Self {
            tiers: vec![ModelTier::Pro, ModelTier::Flash],
        }
    }
}

impl CapabilityLadder {
    pub fn new(tiers: Vec<ModelTier>) -> Self {
        Self { tiers }
    }

    pub fn tiers(&self) -> &[ModelTier] {
        &self.tiers
    }

    /// Tiers tried for a request starting at `tier`.
    fn rungs_from(&self, tier: ModelTier) -> Vec<ModelTier> {
        match self.tiers.iter().position(|t| *t == tier) {
            Some(start) => self.tiers[start..].to_vec(),
            None => vec![tier],
        }
    }

    /// Run `request` on `generator`, downgrading on quota exhaustion.
    pub async fn generate<G: TextGenerator>(
        &self,
        generator: &G,
        request: &GenerationRequest,
    ) -> Result<Generation, GenerationError> {
        let rungs = self.rungs_from(request.tier);

        for (attempt, tier) in rungs.iter().enumerate() {
            match generator.generate(&request.at_tier(*tier)).await {
                Err(GenerationError::QuotaExhausted) if attempt + 1 < rungs.len() => {
                    warn!(tier = ?tier, next = ?rungs[attempt + 1], "Quota exhausted, downgrading model tier");
                }
                other => return other,
            }
        }

        Err(GenerationError::QuotaExhausted)
    }
}

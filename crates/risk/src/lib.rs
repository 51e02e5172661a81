//! Brand score aggregation.
//!
//! Reduces the candidate marks found in the registry and the risk tier read from
//! the legal narrative into one bounded 0-100 brand score (higher is safer).

use brandcheck_model::{CandidateMark, ConfusionRisk, RiskAssessment, RiskTier};
use serde::{Deserialize, Serialize};

/// Configuration for the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Score before any penalty
    pub base_score: i32,
    /// Penalty per active conflicting mark
    pub active_penalty: i32,
    /// Cap on the total active-mark penalty
    pub active_penalty_cap: i32,
    /// Similarity above which a mark counts as a close match
    pub high_similarity_threshold: u8,
    /// Penalty per close match
    pub high_similarity_penalty: i32,
    /// Penalty per figurative mark with non-low visual confusion risk
    pub figurative_penalty: i32,
    pub low_adjustment: i32,
    pub moderate_adjustment: i32,
    pub high_adjustment: i32,
    pub very_high_adjustment: i32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            base_score: 90,
            active_penalty: 5,
            active_penalty_cap: 30,
            high_similarity_threshold: 70,
            high_similarity_penalty: 10,
            figurative_penalty: 8,
            low_adjustment: 5,
            moderate_adjustment: -10,
            high_adjustment: -25,
            very_high_adjustment: -40,
        }
    }
}

impl RiskConfig {
    /// Fixed score adjustment for a narrative risk tier.
    pub fn tier_adjustment(&self, tier: RiskTier) -> i32 {
        match tier {
            RiskTier::Low => self.low_adjustment,
            RiskTier::Moderate => self.moderate_adjustment,
            RiskTier::High => self.high_adjustment,
            RiskTier::VeryHigh => self.very_high_adjustment,
        }
    }
}

/// Number of candidates that are registered, filed, or published.
pub fn active_conflicting_count(candidates: &[CandidateMark]) -> usize {
    candidates
        .iter()
        .filter(|m| m.status.is_active_conflict())
        .count()
}

/// Compute the brand score for a set of candidate marks.
///
/// `has_image_evidence` enables the figurative penalty; it only applies to
/// candidates that carry a visual comparison.
pub fn score(
    candidates: &[CandidateMark],
    tier: RiskTier,
    has_image_evidence: bool,
    config: &RiskConfig,
) -> u8 {
    let mut score = config.base_score;

    let active = active_conflicting_count(candidates) as i32;
    score -= active
        .saturating_mul(config.active_penalty)
        .min(config.active_penalty_cap);

    let close_matches = candidates
        .iter()
        .filter(|m| m.similarity > config.high_similarity_threshold)
        .count() as i32;
    score = score.saturating_sub(close_matches.saturating_mul(config.high_similarity_penalty));

    if has_image_evidence {
        let confusing = candidates
            .iter()
            .filter(|m| m.kind.is_figurative())
            .filter(|m| {
                m.visual_comparison
                    .as_ref()
                    .is_some_and(|v| v.confusion_risk != ConfusionRisk::Low)
            })
            .count() as i32;
        score = score.saturating_sub(confusing.saturating_mul(config.figurative_penalty));
    }

    score = score.saturating_add(config.tier_adjustment(tier));

    score.clamp(0, 100) as u8
}

/// Score and tier together.
pub fn assess(
    candidates: &[CandidateMark],
    tier: RiskTier,
    has_image_evidence: bool,
    config: &RiskConfig,
) -> RiskAssessment {
    RiskAssessment {
        tier,
        score: score(candidates, tier, has_image_evidence, config),
    }
}

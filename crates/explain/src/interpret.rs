//! Interpretation of generated text.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::OnceLock;

use brandcheck_model::{is_valid_class, ConfusionRisk, RiskTier, VisualComparison};
use brandcheck_query::is_vienna_code;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn tier_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    cached(
        &PATTERN,
        r"(?i)\b(?:rischio|risk)(?:\s+(?:level|livello))?[\s:*\-]*(molto\s+alto|very\s+high|alto|high|moderato|moderate|basso|low)\b",
    )
}

/// Recover the risk tier from a free-text narrative.
///
/// Looks for a tier keyword after a `risk`/`rischio` label, case-insensitively.
/// Defaults to `Moderate` when none is found.
pub fn extract_tier(narrative: &str) -> RiskTier {
    tier_pattern()
        .and_then(|re| re.captures(narrative))
        .and_then(|caps| caps.get(1))
        .and_then(|m| RiskTier::from_str(m.as_str()).ok())
        .unwrap_or_default()
}

/// The legal narrative and the tier it concludes with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeVerdict {
    pub tier: RiskTier,
    pub analysis: String,
    /// Whether the tier came from structured output rather than a keyword scan
    pub structured: bool,
}

/// Response schema for a structured legal verdict.
pub fn verdict_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "riskLevel": {
                "type": "STRING",
                "enum": ["LOW", "MODERATE", "HIGH", "VERY_HIGH"]
            },
            "analysis": { "type": "STRING" }
        },
        "required": ["riskLevel", "analysis"]
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuredVerdict {
    risk_level: String,
    analysis: String,
}

/// Read a narrative as structured JSON, falling back to the keyword scan.
pub fn parse_verdict(text: &str) -> NarrativeVerdict {
    let structured = json_payload(text)
        .and_then(|payload| serde_json::from_str::<StructuredVerdict>(payload).ok())
        .and_then(|v| {
            RiskTier::from_str(&v.risk_level)
                .ok()
                .map(|tier| (tier, v.analysis))
        });

    match structured {
        Some((tier, analysis)) => NarrativeVerdict {
            tier,
            analysis,
            structured: true,
        },
        None => NarrativeVerdict {
            tier: extract_tier(text),
            analysis: text.trim().to_string(),
            structured: false,
        },
    }
}

/// Class numbers in a generated list, in order, without duplicates.
///
/// Numbers outside 1-45 are dropped.
pub fn parse_class_list(text: &str) -> Vec<u16> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = cached(&PATTERN, r"\b\d{1,3}\b") else {
        return Vec::new();
    };

    let mut seen = BTreeSet::new();
    re.find_iter(text)
        .filter_map(|m| m.as_str().parse::<u16>().ok())
        .filter(|&c| is_valid_class(c))
        .filter(|&c| seen.insert(c))
        .collect()
}

/// Vision analysis of an uploaded logo.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageAnalysis {
    pub description: String,
    /// Vienna classification codes, validated
    pub visual_codes: Vec<String>,
    /// Words or letters visible in the logo
    pub verbal_elements: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawImageAnalysis {
    #[serde(default)]
    description: String,
    #[serde(default)]
    vienna_codes: Vec<String>,
    #[serde(default)]
    verbal_elements: Vec<String>,
}

/// Response schema for logo analysis.
pub fn image_analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "description": { "type": "STRING" },
            "viennaCodes": { "type": "ARRAY", "items": { "type": "STRING" } },
            "verbalElements": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["description", "viennaCodes"]
    })
}

/// Read a logo analysis. Free text is accepted, with codes picked out of it.
///
/// Returns `None` for blank output.
pub fn parse_image_analysis(text: &str) -> Option<ImageAnalysis> {
    if text.trim().is_empty() {
        return None;
    }

    let raw = json_payload(text)
        .and_then(|payload| serde_json::from_str::<RawImageAnalysis>(payload).ok())
        .unwrap_or_else(|| RawImageAnalysis {
            description: text.trim().to_string(),
            vienna_codes: scan_vienna_codes(text),
            verbal_elements: Vec::new(),
        });

    let mut seen = BTreeSet::new();
    let visual_codes = raw
        .vienna_codes
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| is_vienna_code(c))
        .filter(|c| seen.insert(c.clone()))
        .collect();

    Some(ImageAnalysis {
        description: raw.description.trim().to_string(),
        visual_codes,
        verbal_elements: raw
            .verbal_elements
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect(),
    })
}

fn scan_vienna_codes(text: &str) -> Vec<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&PATTERN, r"\b\d{2}\.\d{2}(?:\.\d{2})?\b")
        .map(|re| re.find_iter(text).map(|m| m.as_str().to_string()).collect())
        .unwrap_or_default()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVisualComparison {
    visual_similarity: f64,
    #[serde(default)]
    confusion_risk: String,
    #[serde(default)]
    reasoning: String,
}

/// Response schema for a logo-to-mark comparison.
pub fn visual_comparison_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "visualSimilarity": { "type": "INTEGER" },
            "confusionRisk": { "type": "STRING", "enum": ["LOW", "MEDIUM", "HIGH"] },
            "reasoning": { "type": "STRING" }
        },
        "required": ["visualSimilarity", "confusionRisk", "reasoning"]
    })
}

/// Read a visual comparison; similarity is clamped to 0-100.
pub fn parse_visual_comparison(text: &str) -> Option<VisualComparison> {
    let raw: RawVisualComparison = serde_json::from_str(json_payload(text)?).ok()?;
    if !raw.visual_similarity.is_finite() {
        return None;
    }

    Some(VisualComparison {
        visual_similarity: raw.visual_similarity.round().clamp(0.0, 100.0) as u8,
        confusion_risk: ConfusionRisk::from_str(&raw.confusion_risk)
            .unwrap_or(ConfusionRisk::Undetermined),
        reasoning: raw.reasoning.trim().to_string(),
    })
}

/// The outermost JSON object in `text`, ignoring code fences and chatter.
fn json_payload(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

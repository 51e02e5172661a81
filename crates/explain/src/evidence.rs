use brandcheck_features::{class_overlap, normalize_text, phonetic_match};
use brandcheck_model::CandidateMark;
use serde::{Deserialize, Serialize};

/// A piece of evidence linking a prior mark to the proposed brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Type of evidence
    pub kind: String,

    /// The specific value or match
    pub value: String,

    /// Optional context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl EvidenceItem {
    fn new(kind: &str, value: impl Into<String>, context: Option<String>) -> Self {
        Self {
            kind: kind.to_string(),
            value: value.into(),
            context,
        }
    }

    /// One-line rendering used inside prompts.
    pub fn render(&self) -> String {
        match &self.context {
            Some(context) => format!("{}: {} ({})", self.kind, self.value, context),
            None => format!("{}: {}", self.kind, self.value),
        }
    }
}

/// Collect the evidence relating `mark` to the proposed `brand_name` in `classes`.
pub fn mark_evidence(mark: &CandidateMark, brand_name: &str, classes: &[u16]) -> Vec<EvidenceItem> {
    let mut evidence = Vec::new();

    if let Some(name) = mark.name.as_deref() {
        let normalized = normalize_text(name);
        if !normalized.is_empty() && normalized == normalize_text(brand_name) {
            evidence.push(EvidenceItem::new("exact_match", name, None));
        } else if let Some((algorithm, code)) = phonetic_match(name, brand_name) {
            evidence.push(EvidenceItem::new(
                &format!("phonetic_{}", algorithm),
                code.clone(),
                Some(format!("both encode to {}", code)),
            ));
        }
    }

    let shared = class_overlap(&mark.classes, classes);
    if !shared.is_empty() {
        evidence.push(EvidenceItem::new(
            "class_overlap",
            shared
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            None,
        ));
    }

    if mark.status.is_active_conflict() {
        evidence.push(EvidenceItem::new("active_right", mark.status.label(), None));
    }

    evidence
}

//! Prompt construction and interpretation of generated output.
//!
//! Everything the pipeline sends to, or reads back from, the generation
//! collaborator goes through this crate:
//! - `prompts`: classification, legal analysis, logo analysis and logo comparison prompts
//! - `evidence`: phonetic, exact-match and class-overlap evidence for each prior mark
//! - `interpret`: risk tier recovery, structured verdicts, class lists and vision results

mod evidence;
mod interpret;
mod prompts;

pub use evidence::{mark_evidence, EvidenceItem};
pub use interpret::{
    extract_tier, image_analysis_schema, parse_class_list, parse_image_analysis, parse_verdict,
    parse_visual_comparison, verdict_schema, visual_comparison_schema, ImageAnalysis,
    NarrativeVerdict,
};
pub use prompts::{
    classification_prompt, image_analysis_prompt, legal_analysis_prompt, visual_comparison_prompt,
    LegalAnalysisInput, LEGAL_REFERENCES,
};

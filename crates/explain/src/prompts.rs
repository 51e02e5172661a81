//! Prompt construction for each generation step.

use brandcheck_model::{CandidateMark, ClassInfo};

use crate::evidence::mark_evidence;

/// Statutes the legal analysis is asked to cite.
pub const LEGAL_REFERENCES: &[&str] = &[
    "Art. 7 CPI - Novelty",
    "Art. 9 CPI - Distinctive character",
    "Art. 10 CPI - Lawfulness",
    "Art. 12 CPI - Likelihood of confusion and association",
    "Art. 13 CPI - Descriptive character",
    "Art. 4 EUTMR - Signs of which an EU trade mark may consist",
    "Art. 7 EUTMR - Absolute grounds for refusal",
    "Art. 8 EUTMR - Relative grounds for refusal",
    "Art. 46 EUTMR - Grounds for opposition",
];

/// Ask for the Nice classes of a description, as a bare comma-separated list.
pub fn classification_prompt(knowledge_base: &str, description: &str) -> String {
    format!(
        "You classify goods and services under the Nice Classification (12th edition).\n\
         Read the description, identify every relevant class including closely related ones, \
         and answer ONLY with the class numbers separated by commas.\n\n\
         KNOWLEDGE BASE:\n{}\n\n\
         DESCRIPTION:\n\"{}\"\n\n\
         CLASSES:",
        knowledge_base,
        description.trim()
    )
}

/// Everything the legal narrative is grounded on.
#[derive(Debug, Clone, Copy)]
pub struct LegalAnalysisInput<'a> {
    pub brand_name: &'a str,
    pub description: &'a str,
    pub classes: &'a [ClassInfo],
    pub countries: &'a [String],
    pub verbal_marks: &'a [CandidateMark],
    pub figurative_marks: &'a [CandidateMark],
    /// Description of the uploaded logo, when one was analysed
    pub logo_description: Option<&'a str>,
}

/// Ask for the legal registrability analysis.
///
/// The first section must state the risk as `RISK: LOW|MODERATE|HIGH|VERY HIGH`
/// so the tier can be recovered from free text.
pub fn legal_analysis_prompt(input: &LegalAnalysisInput<'_>) -> String {
    let class_numbers: Vec<u16> = input.classes.iter().map(|c| c.number).collect();
    let classes = input
        .classes
        .iter()
        .map(|c| format!("Class {} ({})", c.number, c.title))
        .collect::<Vec<_>>()
        .join(", ");
    let countries = if input.countries.is_empty() {
        "EU".to_string()
    } else {
        input.countries.join(", ")
    };

    let mut prompt = format!(
        "You are an intellectual property lawyer specialised in European trade marks.\n\
         Give a professional analysis of whether the proposed mark can be registered.\n\n\
         PROPOSED MARK:\n\
         - Name: \"{}\"\n\
         - Goods/services: \"{}\"\n\
         - Nice classes: {}\n\
         - Territories: {}\n",
        input.brand_name.trim(),
        input.description.trim(),
        classes,
        countries
    );
    if let Some(logo) = input.logo_description {
        prompt.push_str(&format!("- Logo: {}\n", logo.trim()));
    }

    prompt.push_str("\nPRIOR WORD MARKS (official registry data):\n");
    prompt.push_str(&render_marks(input.verbal_marks, input.brand_name, &class_numbers));

    if !input.figurative_marks.is_empty() {
        prompt.push_str("\nPRIOR FIGURATIVE MARKS:\n");
        prompt.push_str(&render_marks(input.figurative_marks, input.brand_name, &class_numbers));
    }

    prompt.push_str(
        "\nSTRUCTURE:\n\
         1. RISK ASSESSMENT - state exactly one of: RISK: LOW / RISK: MODERATE / RISK: HIGH / RISK: VERY HIGH\n\
         2. Absolute grounds (distinctiveness, descriptiveness, lawfulness)\n\
         3. Relative grounds (likelihood of confusion with the prior marks above; phonetic, visual and conceptual similarity; similarity of goods)\n\
         4. Territorial notes for the selected territories\n\
         5. Strategic recommendations\n\
         6. Conclusion with an estimated probability of successful registration\n\n\
         Cite the relevant provisions:\n",
    );
    for reference in LEGAL_REFERENCES {
        prompt.push_str(&format!("- {}\n", reference));
    }
    prompt
}

fn render_marks(marks: &[CandidateMark], brand_name: &str, classes: &[u16]) -> String {
    if marks.is_empty() {
        return "No identical or closely similar marks were found.\n".to_string();
    }

    let mut out = String::new();
    for mark in marks {
        out.push_str(&format!(
            "- \"{}\" ({})\n  Owner: {}\n  Status: {}\n  Classes: {}\n  Similarity: {}%\n  Filed: {}\n",
            mark.display_name(),
            mark.application_number,
            mark.owner,
            mark.status.label(),
            mark.classes
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            mark.similarity,
            if mark.application_date.is_empty() {
                "N/D"
            } else {
                mark.application_date.as_str()
            },
        ));
        if let Some(visual) = &mark.visual_comparison {
            out.push_str(&format!(
                "  Visual similarity: {}% ({:?})\n",
                visual.visual_similarity, visual.confusion_risk
            ));
        }
        for item in mark_evidence(mark, brand_name, classes) {
            out.push_str(&format!("  Evidence: {}\n", item.render()));
        }
    }
    out
}

/// Ask the vision model to describe a logo and code it under the Vienna classification.
pub fn image_analysis_prompt() -> String {
    "Analyse this logo for a trade mark search. Answer with a JSON object:\n\
     {\"description\": string, \"viennaCodes\": [string], \"verbalElements\": [string]}\n\
     - description: the graphical elements, colours and style\n\
     - viennaCodes: the most relevant Vienna classification codes (e.g. \"26.01\", \"27.05.01\")\n\
     - verbalElements: any words or letters shown in the logo"
        .to_string()
}

/// Ask the vision model to compare the uploaded logo with a prior mark image.
pub fn visual_comparison_prompt(mark: &CandidateMark) -> String {
    format!(
        "The first image is a proposed logo, the second is the prior mark \"{}\" ({}). \
         Compare them as a trade mark examiner would. Answer with a JSON object:\n\
         {{\"visualSimilarity\": integer 0-100, \"confusionRisk\": \"LOW\"|\"MEDIUM\"|\"HIGH\", \"reasoning\": string}}",
        mark.display_name(),
        mark.application_number
    )
}

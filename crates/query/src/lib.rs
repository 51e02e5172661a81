//! Registry query construction.
//!
//! Builds queries in the registry's RSQL boolean grammar (`and` / `or` / `=in=`):
//! - word-mark queries match the verbal element fuzzily or exactly
//! - figurative queries match Vienna visual-classification code prefixes

use brandcheck_model::{is_valid_class, MarkKind, MarkStatus};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Empty query text")]
    EmptyQuery,
    #[error("No Nice classes to search")]
    NoClasses,
    #[error("Invalid class number: {0}")]
    InvalidClass(u16),
    #[error("No visual classification codes")]
    NoVisualCodes,
    #[error("Invalid visual classification code: {0}")]
    InvalidVisualCode(String),
}

/// Query for word marks resembling `name` in any of `classes`.
pub fn build_word_query(name: &str, classes: &[u16]) -> Result<String, QueryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(QueryError::EmptyQuery);
    }
    let escaped = escape(name);

    let verbal = format!(
        "(wordMarkSpecification.verbalElement==\"*{0}*\" or wordMarkSpecification.verbalElement==\"{0}\")",
        escaped
    );

    Ok(format!(
        "{} and {} and {}",
        verbal,
        class_filter(classes)?,
        status_filter()
    ))
}

/// Query for figurative/combined marks sharing a Vienna code prefix in any of `classes`.
pub fn build_figurative_query(visual_codes: &[String], classes: &[u16]) -> Result<String, QueryError> {
    if visual_codes.is_empty() {
        return Err(QueryError::NoVisualCodes);
    }
    for code in visual_codes {
        if !is_vienna_code(code) {
            return Err(QueryError::InvalidVisualCode(code.clone()));
        }
    }

    let visual = visual_codes
        .iter()
        .map(|code| format!("markImage.viennaClasses==\"{}*\"", code.trim()))
        .collect::<Vec<_>>()
        .join(" or ");

    let kinds = MarkKind::FIGURATIVE_CODES
        .iter()
        .map(|k| format!("\"{}\"", k))
        .collect::<Vec<_>>()
        .join(",");

    Ok(format!(
        "({}) and {} and {} and markFeature=in=({})",
        visual,
        class_filter(classes)?,
        status_filter(),
        kinds
    ))
}

/// Whether `code` looks like a Vienna code: `NN`, `NN.NN` or `NN.NN.NN`.
pub fn is_vienna_code(code: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d{1,2}(\.\d{1,2}){0,2}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(code.trim()))
}

fn class_filter(classes: &[u16]) -> Result<String, QueryError> {
    if classes.is_empty() {
        return Err(QueryError::NoClasses);
    }
    if let Some(&bad) = classes.iter().find(|&&c| !is_valid_class(c)) {
        return Err(QueryError::InvalidClass(bad));
    }
    let list = classes
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",");
    Ok(format!("niceClasses=in=({})", list))
}

fn status_filter() -> String {
    let list = MarkStatus::SEARCHABLE
        .iter()
        .map(|s| format!("\"{}\"", s.code()))
        .collect::<Vec<_>>()
        .join(",");
    format!("status=in=({})", list)
}

/// Escape quotes and backslashes inside a quoted RSQL argument.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

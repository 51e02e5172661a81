//! Mapping of raw registry records into `CandidateMark`s.

use brandcheck_features::similarity;
use brandcheck_model::{is_valid_class, CandidateMark, MarkKind, MarkStatus};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{BackendError, RawSearchResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryRecord {
    application_number: String,
    #[serde(default)]
    word_mark_specification: Option<WordMarkSpecification>,
    #[serde(default)]
    applicants: Vec<Applicant>,
    status: String,
    #[serde(default)]
    nice_classes: Vec<i64>,
    #[serde(default)]
    application_date: Option<String>,
    #[serde(default)]
    registration_date: Option<String>,
    #[serde(default)]
    expiry_date: Option<String>,
    #[serde(default)]
    mark_feature: Option<String>,
    #[serde(default)]
    basis: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WordMarkSpecification {
    #[serde(default)]
    verbal_element: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Applicant {
    #[serde(default)]
    name: Option<String>,
}

impl RegistryRecord {
    fn verbal_element(&self) -> Option<&str> {
        self.word_mark_specification
            .as_ref()
            .and_then(|w| w.verbal_element.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn into_candidate(self, candidate_name: Option<&str>) -> Result<CandidateMark, BackendError> {
        let status: MarkStatus = self
            .status
            .parse()
            .map_err(|e| BackendError::Parse(format!("{}", e)))?;

        let name = self.verbal_element().map(str::to_string);

        let kind = match self.mark_feature.as_deref().map(str::parse::<MarkKind>) {
            Some(Ok(kind)) => kind,
            _ if name.is_some() => MarkKind::Word,
            _ => MarkKind::Figurative,
        };

        let mut classes: Vec<u16> = self
            .nice_classes
            .iter()
            .filter_map(|&c| u16::try_from(c).ok())
            .filter(|&c| is_valid_class(c))
            .collect();
        classes.sort_unstable();
        classes.dedup();

        let similarity = match (name.as_deref(), candidate_name) {
            (Some(verbal), Some(candidate)) => similarity(verbal, candidate),
            _ => 0,
        };

        Ok(CandidateMark {
            name,
            owner: self
                .applicants
                .into_iter()
                .next()
                .and_then(|a| a.name)
                .unwrap_or_else(|| "N/D".to_string()),
            status,
            classes,
            application_number: self.application_number,
            application_date: self.application_date.unwrap_or_default(),
            registration_date: self.registration_date,
            expiry_date: self.expiry_date,
            kind,
            similarity,
            visual_comparison: None,
            basis: self.basis.unwrap_or_else(|| "EUTM".to_string()),
            image_url: self.image_url,
        })
    }
}

/// Map raw registry records into candidate marks ordered by similarity.
///
/// Similarity is computed against `candidate_name` when the record has a
/// verbal element, else it is 0. Records that fail to parse are skipped.
/// The sort is stable, so registry order is kept among ties.
pub fn parse_response(raw: &RawSearchResponse, candidate_name: Option<&str>) -> Vec<CandidateMark> {
    let mut marks = Vec::with_capacity(raw.trademarks.len());

    for (index, value) in raw.trademarks.iter().enumerate() {
        let parsed = RegistryRecord::deserialize(value)
            .map_err(|e| BackendError::Parse(e.to_string()))
            .and_then(|record| record.into_candidate(candidate_name));

        match parsed {
            Ok(mark) => marks.push(mark),
            Err(e) => warn!(index, error = %e, "Skipping unparseable registry record"),
        }
    }

    marks.sort_by(|a, b| b.similarity.cmp(&a.similarity));
    debug!(
        received = raw.trademarks.len(),
        parsed = marks.len(),
        "Parsed registry response"
    );
    marks
}

//! Core domain model for brandcheck trademark conflict analysis.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `CandidateMark`: A prior mark returned by the registry, scored against the brand
//! - `MarkStatus` / `MarkKind`: Registry lifecycle status and mark type
//! - `ClassificationResult`: The Nice classes identified for a product description
//! - `RiskTier` / `RiskAssessment`: The aggregated registrability risk
//! - `SearchRequest` / `SearchResponse`: The JSON wire shapes of the search endpoint

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Lowest valid Nice class number.
pub const MIN_NICE_CLASS: u16 = 1;
/// Highest valid Nice class number.
pub const MAX_NICE_CLASS: u16 = 45;

/// Whether `class` is one of the 45 Nice classes.
pub fn is_valid_class(class: u16) -> bool {
    (MIN_NICE_CLASS..=MAX_NICE_CLASS).contains(&class)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown mark status: {0}")]
    UnknownStatus(String),
    #[error("Unknown mark kind: {0}")]
    UnknownKind(String),
    #[error("Unknown risk tier: {0}")]
    UnknownTier(String),
}

/// Status of a mark in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarkStatus {
    Registered,
    Filed,
    Published,
    Opposed,
    Refused,
    Expired,
    Withdrawn,
}

impl MarkStatus {
    /// Statuses a registry search is restricted to.
    pub const SEARCHABLE: [MarkStatus; 4] = [
        MarkStatus::Registered,
        MarkStatus::Filed,
        MarkStatus::Published,
        MarkStatus::Opposed,
    ];

    /// Registry code used in queries.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::Filed => "FILED",
            Self::Published => "PUBLISHED",
            Self::Opposed => "OPPOSED",
            Self::Refused => "REFUSED",
            Self::Expired => "EXPIRED",
            Self::Withdrawn => "WITHDRAWN",
        }
    }

    /// Get a human-readable label for this status.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Registered => "Registered",
            Self::Filed => "Filed",
            Self::Published => "Published",
            Self::Opposed => "Under opposition",
            Self::Refused => "Refused",
            Self::Expired => "Expired",
            Self::Withdrawn => "Withdrawn",
        }
    }

    /// Marks in these states block a new filing outright.
    pub fn is_active_conflict(&self) -> bool {
        matches!(self, Self::Registered | Self::Filed | Self::Published)
    }
}

impl FromStr for MarkStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REGISTERED" => Ok(Self::Registered),
            "FILED" | "RECEIVED" | "UNDER_EXAMINATION" => Ok(Self::Filed),
            "PUBLISHED" | "APPLICATION_PUBLISHED" => Ok(Self::Published),
            "OPPOSED" | "OPPOSITION_PENDING" => Ok(Self::Opposed),
            "REFUSED" => Ok(Self::Refused),
            "EXPIRED" | "CANCELLED" | "SURRENDERED" => Ok(Self::Expired),
            "WITHDRAWN" => Ok(Self::Withdrawn),
            _ => Err(ModelError::UnknownStatus(s.to_string())),
        }
    }
}

/// Whether a mark is purely verbal or carries a graphical element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarkKind {
    Word,
    Figurative,
    Combined,
}

impl MarkKind {
    /// Registry codes used when restricting a query to image-bearing marks.
    pub const FIGURATIVE_CODES: [&'static str; 2] = ["FIGURATIVE", "COMBINED"];

    pub fn is_figurative(&self) -> bool {
        matches!(self, Self::Figurative | Self::Combined)
    }
}

impl FromStr for MarkKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "WORD" => Ok(Self::Word),
            "FIGURATIVE" | "SHAPE_3D" | "POSITION" | "PATTERN" => Ok(Self::Figurative),
            "COMBINED" => Ok(Self::Combined),
            _ => Err(ModelError::UnknownKind(s.to_string())),
        }
    }
}

/// Likelihood of confusion from a visual comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfusionRisk {
    Low,
    Medium,
    High,
    Undetermined,
}

impl FromStr for ConfusionRisk {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LOW" | "BASSO" => Ok(Self::Low),
            "MEDIUM" | "MODERATE" | "MEDIO" | "MODERATO" => Ok(Self::Medium),
            "HIGH" | "ALTO" => Ok(Self::High),
            _ => Ok(Self::Undetermined),
        }
    }
}

/// Result of comparing the uploaded logo with a prior figurative mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualComparison {
    /// Visual closeness, 0-100
    pub visual_similarity: u8,
    pub confusion_risk: ConfusionRisk,
    pub reasoning: String,
}

/// A previously filed or registered mark that may conflict with the brand.
///
/// Built once from a registry record and never mutated afterwards, except for
/// attaching a visual comparison before it is handed to the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMark {
    /// Verbal element; `None` for purely graphical marks
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub owner: String,

    pub status: MarkStatus,

    /// Nice classes, sorted and within 1..=45
    #[serde(rename = "categoryCodes", default)]
    pub classes: Vec<u16>,

    pub application_number: String,

    pub application_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,

    pub kind: MarkKind,

    /// Lexical closeness to the brand name, 0-100
    pub similarity: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_comparison: Option<VisualComparison>,

    /// Filing basis (EUTM, international registration, ...)
    #[serde(default = "default_basis")]
    pub basis: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

fn default_basis() -> String {
    "EUTM".to_string()
}

impl CandidateMark {
    /// Create a minimal registered word mark for testing.
    pub fn new(application_number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            owner: String::new(),
            status: MarkStatus::Registered,
            classes: Vec::new(),
            application_number: application_number.into(),
            application_date: String::new(),
            registration_date: None,
            expiry_date: None,
            kind: MarkKind::Word,
            similarity: 0,
            visual_comparison: None,
            basis: default_basis(),
            image_url: None,
        }
    }

    pub fn with_status(mut self, status: MarkStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_kind(mut self, kind: MarkKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_classes(mut self, classes: Vec<u16>) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_similarity(mut self, similarity: u8) -> Self {
        self.similarity = similarity.min(100);
        self
    }

    /// Display name, `N/D` when the mark has no verbal element.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("N/D")
    }
}

/// A Nice class annotated with its taxonomy text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub number: u16,
    pub title: String,
    pub description: String,
}

/// Nice classes identified for a product/service description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub classes: Vec<ClassInfo>,
}

impl ClassificationResult {
    pub fn numbers(&self) -> Vec<u16> {
        self.classes.iter().map(|c| c.number).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Coarse registrability risk bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    Low,
    #[default]
    Moderate,
    High,
    VeryHigh,
}

impl RiskTier {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::VeryHigh => "Very High",
        }
    }
}

impl FromStr for RiskTier {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_uppercase();
        match key.as_str() {
            "LOW" | "BASSO" => Ok(Self::Low),
            "MODERATE" | "MODERATO" | "MEDIUM" | "MEDIO" => Ok(Self::Moderate),
            "HIGH" | "ALTO" => Ok(Self::High),
            "VERY_HIGH" | "VERYHIGH" | "MOLTO_ALTO" => Ok(Self::VeryHigh),
            _ => Err(ModelError::UnknownTier(s.to_string())),
        }
    }
}

/// Aggregated risk for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub tier: RiskTier,
    /// Brand score, 0-100 (higher is safer)
    pub score: u8,
}

/// Which registry searches a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Verbal,
    Figurative,
    Combined,
}

impl SearchType {
    pub fn runs_word_search(&self) -> bool {
        matches!(self, Self::Verbal | Self::Combined)
    }

    pub fn runs_image_search(&self) -> bool {
        matches!(self, Self::Figurative | Self::Combined)
    }
}

/// Base64-encoded logo supplied with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub base64: String,
    pub mime_type: String,
}

/// Inbound search request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub brand_name: Option<String>,

    #[serde(default)]
    pub product_description: Option<String>,

    #[serde(default)]
    pub selected_countries: Vec<String>,

    #[serde(default)]
    pub image_data: Option<ImageData>,

    #[serde(default)]
    pub search_type: Option<SearchType>,
}

impl SearchRequest {
    pub fn new(brand_name: impl Into<String>, product_description: impl Into<String>) -> Self {
        Self {
            brand_name: Some(brand_name.into()),
            product_description: Some(product_description.into()),
            ..Default::default()
        }
    }

    /// Explicit search type, else `Combined` when a logo is attached, else `Verbal`.
    pub fn effective_search_type(&self) -> SearchType {
        match (self.search_type, &self.image_data) {
            (Some(search_type), _) => search_type,
            (None, Some(_)) => SearchType::Combined,
            (None, None) => SearchType::Verbal,
        }
    }
}

/// Metadata describing how a response was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetadata {
    /// RFC 3339 timestamp
    pub search_date: String,
    pub total_results: usize,
    pub database_source: String,
    /// Model that produced the legal narrative
    pub analysis_model: String,
    pub search_type: SearchType,
    /// Classification strategy that produced the classes
    pub classifier: String,
    /// Steps that failed and were skipped
    #[serde(default)]
    pub degraded: Vec<String>,
}

/// Successful search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub brand_score: u8,
    pub risk_level: RiskTier,
    pub identified_classes: Vec<ClassInfo>,
    pub verbal_marks: Vec<CandidateMark>,
    pub figurative_marks: Vec<CandidateMark>,
    pub synthetic_judgment: String,
    pub search_metadata: SearchMetadata,
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: bool,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }
}

use brandcheck_risk::RiskConfig;
use serde::{Deserialize, Serialize};

/// Tunables of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Accepted logo MIME types
    pub allowed_mime_types: Vec<String>,
    /// Upper bound on the base64-encoded logo, in bytes
    pub max_image_bytes: usize,
    /// Figurative candidates compared visually with the logo
    pub visual_comparison_limit: usize,
    /// Ask the narrative model for a schema-validated verdict
    pub structured_output: bool,
    pub risk: RiskConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
            max_image_bytes: 7 * 1024 * 1024,
            visual_comparison_limit: 3,
            structured_output: true,
            risk: RiskConfig::default(),
        }
    }
}

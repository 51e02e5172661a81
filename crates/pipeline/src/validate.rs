//! Request validation, run before any collaborator is called.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use brandcheck_model::{ImageData, SearchRequest, SearchType};

use crate::{PipelineConfig, PipelineError};

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    /// Present whenever the search type runs a word-mark search
    pub brand_name: Option<String>,
    pub description: String,
    pub countries: Vec<String>,
    /// Logo with any `data:` prefix removed
    pub image: Option<ImageData>,
    pub search_type: SearchType,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Check required fields and the attached logo.
///
/// `brandName` and `productDescription` are required, except for figurative
/// searches which need `imageData` and `productDescription` instead.
pub fn validate(request: SearchRequest, config: &PipelineConfig) -> Result<ValidatedRequest, PipelineError> {
    let search_type = request.effective_search_type();

    let description = non_blank(request.product_description)
        .ok_or_else(|| PipelineError::Validation("productDescription is required".to_string()))?;
    let brand_name = non_blank(request.brand_name);

    match search_type {
        SearchType::Figurative if request.image_data.is_none() => {
            return Err(PipelineError::Validation(
                "imageData is required for a figurative search".to_string(),
            ));
        }
        SearchType::Verbal | SearchType::Combined if brand_name.is_none() => {
            return Err(PipelineError::Validation("brandName is required".to_string()));
        }
        _ => {}
    }

    let image = request
        .image_data
        .map(|image| validate_image(image, config))
        .transpose()?;

    Ok(ValidatedRequest {
        brand_name,
        description,
        countries: request
            .selected_countries
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        image,
        search_type,
    })
}

fn validate_image(image: ImageData, config: &PipelineConfig) -> Result<ImageData, PipelineError> {
    let mime_type = image.mime_type.trim().to_lowercase();
    if !config.allowed_mime_types.iter().any(|m| *m == mime_type) {
        return Err(PipelineError::Validation(format!(
            "Unsupported image type: {}",
            image.mime_type
        )));
    }

    // browsers send data URLs; keep only the payload
    let payload = match image.base64.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => image.base64.as_str(),
    }
    .trim();

    if payload.is_empty() {
        return Err(PipelineError::Validation("imageData is empty".to_string()));
    }
    if payload.len() > config.max_image_bytes {
        return Err(PipelineError::Validation(format!(
            "Image exceeds {} bytes",
            config.max_image_bytes
        )));
    }
    STANDARD
        .decode(payload)
        .map_err(|e| PipelineError::Validation(format!("imageData is not valid base64: {}", e)))?;

    Ok(ImageData {
        base64: payload.to_string(),
        mime_type,
    })
}

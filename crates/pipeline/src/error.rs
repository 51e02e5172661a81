use brandcheck_backend_euipo::BackendError;
use brandcheck_classify::ClassifyError;
use brandcheck_generation::GenerationError;
use brandcheck_query::QueryError;
use thiserror::Error;

/// Failures that end a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("No relevant Nice class could be identified")]
    ClassificationFailure,

    #[error("Generation quota exhausted")]
    QuotaExhausted,

    #[error("Registry authentication failed: {0}")]
    Authentication(String),

    #[error("Registry search failed: {0}")]
    RegistrySearch(String),

    #[error("Generation service unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// HTTP status reported to the caller.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::ClassificationFailure => 422,
            Self::QuotaExhausted => 429,
            Self::Authentication(_) | Self::RegistrySearch(_) | Self::GenerationUnavailable(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Message safe to show to the caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::ClassificationFailure => {
                "Could not identify any relevant Nice class for the description.".to_string()
            }
            Self::QuotaExhausted => "Request limit reached. Try again in a few minutes.".to_string(),
            Self::Authentication(_) | Self::RegistrySearch(_) => {
                "Trademark registry temporarily unavailable.".to_string()
            }
            Self::GenerationUnavailable(_) => "Analysis service temporarily unavailable.".to_string(),
            Self::Internal(_) => "Internal error.".to_string(),
        }
    }
}

impl From<BackendError> for PipelineError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Authentication(message) => Self::Authentication(message),
            other => Self::RegistrySearch(other.to_string()),
        }
    }
}

impl From<GenerationError> for PipelineError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::QuotaExhausted => Self::QuotaExhausted,
            GenerationError::Config(message) => Self::Internal(message),
            other => Self::GenerationUnavailable(other.to_string()),
        }
    }
}

impl From<ClassifyError> for PipelineError {
    fn from(e: ClassifyError) -> Self {
        match e {
            ClassifyError::Taxonomy(message) => Self::Internal(message),
            ClassifyError::Unavailable(_) => Self::ClassificationFailure,
        }
    }
}

impl From<QueryError> for PipelineError {
    fn from(e: QueryError) -> Self {
        Self::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(PipelineError::Validation("x".into()).status_code(), 400);
        assert_eq!(PipelineError::ClassificationFailure.status_code(), 422);
        assert_eq!(PipelineError::from(GenerationError::QuotaExhausted).status_code(), 429);
        assert_eq!(
            PipelineError::from(BackendError::Authentication("bad".into())).status_code(),
            503
        );
        assert_eq!(
            PipelineError::from(BackendError::Connection("reset".into())).status_code(),
            503
        );
        assert_eq!(
            PipelineError::from(GenerationError::Unavailable("down".into())).status_code(),
            503
        );
        assert_eq!(PipelineError::from(QueryError::NoClasses).status_code(), 500);
    }

    #[test]
    fn test_public_message_hides_detail() {
        let error = PipelineError::RegistrySearch("HTTP 500: stack trace".into());
        assert!(!error.public_message().contains("stack trace"));
        let error = PipelineError::Validation("productDescription is required".into());
        assert_eq!(error.public_message(), "productDescription is required");
    }
}

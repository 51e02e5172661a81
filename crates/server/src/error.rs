use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use brandcheck_model::ErrorBody;
use brandcheck_pipeline::PipelineError;

/// Errors returned by HTTP handlers, rendered as `{ error: true, message }`.
#[derive(Debug)]
pub enum AppError {
    RateLimited,
    /// Body could not be read or decoded
    Rejected(StatusCode, String),
    Pipeline(PipelineError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Rejected(status, _) => *status,
            Self::Pipeline(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::RateLimited => "Too many requests. Try again in a minute.".to_string(),
            Self::Rejected(_, message) => message.clone(),
            Self::Pipeline(e) => e.public_message(),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        Self::Pipeline(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::new(self.message()))).into_response()
    }
}

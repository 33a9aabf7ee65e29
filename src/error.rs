// rams-document-service/src/error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RamsError>;

#[derive(Error, Debug)]
pub enum RamsError {
    #[error("Template error: {0}")]
    TemplateError(#[from] handlebars::TemplateError),

    #[error("Rendering error: {0}")]
    RenderError(#[from] handlebars::RenderError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Pandoc error: {0}")]
    PandocError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Base64 encoding error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Generation attempt timed out after {0}s")]
    AttemptTimedOut(u64),

    #[error("Preview unavailable: {0}")]
    RenderDisplay(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("No generated document is ready")]
    NotReady,
}

impl RamsError {
    pub fn error_type(&self) -> &'static str {
        match self {
            RamsError::TemplateError(_) => "template_error",
            RamsError::RenderError(_) => "render_error",
            RamsError::IoError(_) => "io_error",
            RamsError::PandocError(_) => "pandoc_error",
            RamsError::SerializationError(_) => "serialization_error",
            RamsError::Base64Error(_) => "base64_error",
            RamsError::InvalidData(_) => "invalid_data",
            RamsError::GenerationFailed(_) => "generation_failed",
            RamsError::AttemptTimedOut(_) => "attempt_timed_out",
            RamsError::RenderDisplay(_) => "render_display",
            RamsError::Validation(_) => "validation",
            RamsError::NotReady => "not_ready",
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            error_type: self.error_type().to_string(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
}

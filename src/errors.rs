// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

use crate::models::Platform;

#[derive(Error, Debug)]
pub enum TravelAgentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Maximum {max} photos allowed for {platform}. Deselect one first.")]
    SelectionFull { platform: Platform, max: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Model service error: {0}")]
    Model(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for TravelAgentError {
    fn from(e: serde_json::Error) -> Self {
        TravelAgentError::Serialization(e.to_string())
    }
}

impl From<redis::RedisError> for TravelAgentError {
    fn from(e: redis::RedisError) -> Self {
        TravelAgentError::Storage(e.to_string())
    }
}

impl TravelAgentError {
    fn label(&self) -> &'static str {
        match self {
            TravelAgentError::Validation(_) => "Validation error",
            TravelAgentError::SelectionFull { .. } => "Selection full",
            TravelAgentError::NotFound(_) => "Not found",
            TravelAgentError::Storage(_) => "Storage error",
            TravelAgentError::Model(_) => "AI service error",
            TravelAgentError::ImageProcessing(_) => "Image processing error",
            TravelAgentError::Serialization(_) => "Data processing error",
            TravelAgentError::Config(_) => "Configuration error",
            TravelAgentError::Internal(_) => "Internal error",
        }
    }
}

impl ResponseError for TravelAgentError {
    fn status_code(&self) -> StatusCode {
        match self {
            TravelAgentError::Validation(_)
            | TravelAgentError::SelectionFull { .. }
            | TravelAgentError::ImageProcessing(_) => StatusCode::BAD_REQUEST,
            TravelAgentError::NotFound(_) => StatusCode::NOT_FOUND,
            TravelAgentError::Model(_) => StatusCode::SERVICE_UNAVAILABLE,
            TravelAgentError::Storage(_)
            | TravelAgentError::Serialization(_)
            | TravelAgentError::Config(_)
            | TravelAgentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.label(),
            "message": self.to_string()
        }))
    }
}

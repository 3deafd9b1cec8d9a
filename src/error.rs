use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Audio decode failed: {0}")]
    AudioError(String),

    #[error("Speaker not found: {0}")]
    SpeakerNotFound(String),

    #[error("Model load failed: {0}")]
    ModelError(String),

    #[error("Inference failed: {0}")]
    InferenceError(String),

    #[error("Request timed out")]
    Timeout,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::AudioError(msg) => (StatusCode::BAD_REQUEST, "AUDIO_ERROR", msg.clone()),
            AppError::SpeakerNotFound(s) => (
                StatusCode::NOT_FOUND,
                "SPEAKER_NOT_FOUND",
                format!("Speaker '{}' not found", s),
            ),
            AppError::ModelError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "MODEL_ERROR",
                msg.clone(),
            ),
            AppError::InferenceError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INFERENCE_ERROR",
                msg.clone(),
            ),
            AppError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "TIMEOUT",
                "Request timed out".to_string(),
            ),
            AppError::IoError(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                e.to_string(),
            ),
            AppError::JsonError(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "JSON_ERROR",
                e.to_string(),
            ),
        };

        tracing::error!("Request failed: {} - {}", code, message);

        (
            status,
            Json(ErrorResponse {
                error: message,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

//! STT service HTTP surface: `/health` and `/transcribe`.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{run_inference, HealthResponse, TranscribeResponse};
use crate::error::AppError;
use crate::stt::SttService;

/// Uploads above this are rejected outright
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

pub struct SttState {
    pub stt: SttService,
    pub model_name: String,
    pub device: String,
    pub limiter: Arc<Semaphore>,
    pub timeout: Duration,
}

pub fn create_router(state: Arc<SttState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/transcribe", post(transcribe))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health(State(state): State<Arc<SttState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.model_name.clone(),
        device: state.device.clone(),
    })
}

/// Pull the `audio` payload and optional `language` hint out of the form.
///
/// A missing or empty `audio` field is a client error before any model work
/// happens.
pub async fn read_transcribe_fields(
    mut multipart: Multipart,
) -> Result<(Bytes, Option<String>), AppError> {
    let mut audio = None;
    let mut language = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("audio") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read audio: {}", e)))?;
                audio = Some(bytes);
            }
            Some("language") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read language: {}", e)))?;
                language = Some(text);
            }
            _ => {}
        }
    }

    let audio = audio.ok_or_else(|| AppError::BadRequest("Missing 'audio' field".into()))?;
    if audio.is_empty() {
        return Err(AppError::BadRequest("Empty audio file".into()));
    }

    Ok((audio, language))
}

pub async fn transcribe(
    State(state): State<Arc<SttState>>,
    multipart: Multipart,
) -> Result<Json<TranscribeResponse>, AppError> {
    let (audio, language) = read_transcribe_fields(multipart).await?;

    tracing::info!("Transcribe request: {} bytes", audio.len());

    // Inference is synchronous; keep it off the async workers so /health
    // stays responsive under load.
    let worker_state = Arc::clone(&state);
    let result = run_inference(&state.limiter, state.timeout, move || {
        worker_state.stt.transcribe(&audio, language.as_deref())
    })
    .await?;

    Ok(Json(TranscribeResponse {
        text: result.text,
        language: result.language,
        duration: result.duration_secs,
    }))
}

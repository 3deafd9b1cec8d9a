//! TTS service HTTP surface: `/health` and `/synthesize`.

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{run_inference, HealthResponse, SynthesizeRequest};
use crate::error::AppError;
use crate::tts::TtsService;

const MAX_TEXT_CHARS: usize = 10000;

pub struct TtsState {
    pub tts: TtsService,
    pub model_name: String,
    pub device: String,
    pub limiter: Arc<Semaphore>,
    pub timeout: Duration,
}

pub fn create_router(state: Arc<TtsState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/synthesize", post(synthesize))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health(State(state): State<Arc<TtsState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.model_name.clone(),
        device: state.device.clone(),
    })
}

pub async fn synthesize(
    State(state): State<Arc<TtsState>>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Response, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::BadRequest("Text cannot be empty".into()));
    }

    if request.text.len() > MAX_TEXT_CHARS {
        return Err(AppError::BadRequest(format!(
            "Text too long (max {} chars)",
            MAX_TEXT_CHARS
        )));
    }

    tracing::info!(
        "Synthesize request: {} chars, speaker={}, language={}",
        request.text.len(),
        request.speaker,
        request.language
    );

    let start = Instant::now();
    let worker_state = Arc::clone(&state);
    let wav = run_inference(&state.limiter, state.timeout, move || {
        worker_state.tts.synthesize(
            &request.text,
            &request.speaker,
            &request.language,
            &request.instruct,
        )
    })
    .await?;

    let elapsed = start.elapsed().as_secs_f64();

    Ok((
        StatusCode::OK,
        [
            ("content-type", "audio/wav".to_string()),
            ("x-duration", format!("{:.3}", elapsed)),
        ],
        wav,
    )
        .into_response())
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

use speech_server::api::tts::{create_router, TtsState};
use speech_server::device;
use speech_server::tts::TtsService;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Configuration from environment
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8200".to_string())
        .parse()
        .expect("PORT must be a number");
    let voices_dir = std::env::var("VOICES_DIR").unwrap_or_else(|_| "./voices".to_string());
    let model_name =
        std::env::var("TTS_MODEL").unwrap_or_else(|_| "vits-custom-voice".to_string());
    let default_speaker =
        std::env::var("DEFAULT_SPEAKER").unwrap_or_else(|_| "Ryan".to_string());
    let max_concurrent: usize = std::env::var("MAX_CONCURRENT_REQUESTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);
    let timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(300);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Invalid address");

    let device = device::detect();

    tracing::info!("TTS Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Voices directory: {}", voices_dir);
    tracing::info!("Loading {} on {}...", model_name, device);

    let tts = TtsService::new(voices_dir.into());

    match tts.speakers() {
        Ok(speakers) if !speakers.is_empty() => {
            tracing::info!("Installed speakers: {}", speakers.join(", "));
        }
        Ok(_) => tracing::warn!("No speakers installed in voices directory"),
        Err(e) => tracing::warn!("Failed to scan voices directory: {}", e),
    }

    // Warm the default speaker so the first request doesn't pay model load
    if let Err(e) = tts.preload(&default_speaker) {
        tracing::warn!("Could not preload speaker '{}': {}", default_speaker, e);
    }

    let state = Arc::new(TtsState {
        tts,
        model_name,
        device: device.to_string(),
        limiter: Arc::new(Semaphore::new(max_concurrent)),
        timeout: Duration::from_secs(timeout_secs),
    });

    let app = create_router(state);

    tracing::info!("Ready -- http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app).await.expect("Server error");
}

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

use speech_server::api::stt::{create_router, SttState};
use speech_server::device;
use speech_server::stt::SttService;

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
        .unwrap_or_else(|_| "8100".to_string())
        .parse()
        .expect("PORT must be a number");
    let model_name = std::env::var("WHISPER_MODEL").unwrap_or_else(|_| "large-v3".to_string());
    let models_dir = std::env::var("MODELS_DIR").unwrap_or_else(|_| "./models".to_string());
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
    let model_dir = PathBuf::from(&models_dir).join(&model_name);

    tracing::info!("STT Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Loading {} on {}...", model_name, device);

    let stt = SttService::load(&model_dir).expect("Failed to load STT model");

    let state = Arc::new(SttState {
        stt,
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

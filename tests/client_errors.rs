//! Client-error paths driven through the real routers.
//!
//! None of these require model weights: request validation and speaker
//! resolution fail before any ONNX session is touched.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Multipart;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::Router;
use http_body_util::BodyExt;
use tokio::sync::Semaphore;
use tower::ServiceExt;

use speech_server::api::stt::read_transcribe_fields;
use speech_server::api::tts::{create_router, TtsState};
use speech_server::error::AppError;
use speech_server::tts::TtsService;

fn tts_router() -> Router {
    // Voices dir that doesn't exist: every speaker lookup misses
    let state = Arc::new(TtsState {
        tts: TtsService::new("/nonexistent-voices".into()),
        model_name: "vits-custom-voice".to_string(),
        device: "cpu".to_string(),
        limiter: Arc::new(Semaphore::new(4)),
        timeout: Duration::from_secs(5),
    });
    create_router(state)
}

async fn post_synthesize(body: &str) -> (StatusCode, serde_json::Value) {
    let response = tts_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/synthesize")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

#[tokio::test]
async fn synthesize_empty_text_is_400() {
    let (status, body) = post_synthesize(r#"{"text": ""}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["error"], "Text cannot be empty");
}

#[tokio::test]
async fn synthesize_whitespace_text_is_400() {
    let (status, body) = post_synthesize(r#"{"text": "   "}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn synthesize_oversized_text_is_400() {
    let text = "a".repeat(10001);
    let (status, body) = post_synthesize(&format!(r#"{{"text": "{}"}}"#, text)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn synthesize_unknown_speaker_is_404() {
    let (status, body) =
        post_synthesize(r#"{"text": "hello", "speaker": "Zelda"}"#).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SPEAKER_NOT_FOUND");
}

#[tokio::test]
async fn synthesize_unknown_language_is_400() {
    let (status, body) =
        post_synthesize(r#"{"text": "hello", "language": "Klingon"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["error"].as_str().unwrap().contains("Klingon"));
}

// The transcribe field parsing is shared with the real handler; a router
// built on it exercises the multipart validation without a loaded model.
fn transcribe_fields_router() -> Router {
    Router::new().route(
        "/transcribe",
        post(|multipart: Multipart| async move {
            read_transcribe_fields(multipart)
                .await
                .map(|_| StatusCode::OK)
        }),
    )
}

async fn post_multipart(body: &str) -> (StatusCode, serde_json::Value) {
    let response = transcribe_fields_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/transcribe")
                .header("content-type", "multipart/form-data; boundary=boundary")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

#[tokio::test]
async fn transcribe_missing_audio_field_is_400() {
    let body = concat!(
        "--boundary\r\n",
        "Content-Disposition: form-data; name=\"language\"\r\n",
        "\r\n",
        "en\r\n",
        "--boundary--\r\n",
    );
    let (status, body) = post_multipart(body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["error"], "Missing 'audio' field");
}

#[tokio::test]
async fn transcribe_empty_audio_field_is_400() {
    let body = concat!(
        "--boundary\r\n",
        "Content-Disposition: form-data; name=\"audio\"; filename=\"a.wav\"\r\n",
        "Content-Type: audio/wav\r\n",
        "\r\n",
        "\r\n",
        "--boundary--\r\n",
    );
    let (status, body) = post_multipart(body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["error"], "Empty audio file");
}

#[tokio::test]
async fn transcribe_fields_accepts_audio_and_hint() {
    let body = concat!(
        "--boundary\r\n",
        "Content-Disposition: form-data; name=\"audio\"; filename=\"a.wav\"\r\n",
        "Content-Type: audio/wav\r\n",
        "\r\n",
        "RIFFdata\r\n",
        "--boundary\r\n",
        "Content-Disposition: form-data; name=\"language\"\r\n",
        "\r\n",
        "en\r\n",
        "--boundary--\r\n",
    );
    let response = transcribe_fields_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/transcribe")
                .header("content-type", "multipart/form-data; boundary=boundary")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// Undecodable (but present) audio must also stay a client error; checked at
// the service layer since a full transcription needs weights.
#[test]
fn garbage_audio_is_a_client_error() {
    let err = speech_server::audio::decode(b"not audio at all").unwrap_err();
    assert!(matches!(err, AppError::AudioError(_)));
}

pub mod stt;
pub mod tts;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::AppError;

/// Run a synchronous model call on the blocking pool under the service's
/// concurrency limit and deadline.
///
/// The permit moves into the worker, so a timed-out request keeps its slot
/// occupied until the model call actually returns; the concurrency bound
/// holds even when callers give up early.
pub async fn run_inference<T, F>(
    limiter: &Arc<Semaphore>,
    deadline: Duration,
    work: F,
) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let permit = Arc::clone(limiter)
        .acquire_owned()
        .await
        .expect("Semaphore should never be closed");

    let task = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        work()
    });

    tokio::time::timeout(deadline, task)
        .await
        .map_err(|_| AppError::Timeout)?
        .map_err(|e| AppError::InferenceError(format!("Worker task failed: {}", e)))?
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub device: String,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
    pub language: String,
    /// Audio duration in seconds
    pub duration: f32,
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    #[serde(default = "default_speaker")]
    pub speaker: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub instruct: String,
}

fn default_speaker() -> String {
    "Ryan".to_string()
}

fn default_language() -> String {
    "English".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_request_defaults() {
        let req: SynthesizeRequest = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(req.speaker, "Ryan");
        assert_eq!(req.language, "English");
        assert_eq!(req.instruct, "");
    }

    #[test]
    fn test_synthesize_request_full() {
        let req: SynthesizeRequest = serde_json::from_str(
            r#"{"text": "hi", "speaker": "Vivian", "language": "French", "instruct": "slowly"}"#,
        )
        .unwrap();
        assert_eq!(req.speaker, "Vivian");
        assert_eq!(req.language, "French");
        assert_eq!(req.instruct, "slowly");
    }

    #[test]
    fn test_synthesize_request_requires_text() {
        assert!(serde_json::from_str::<SynthesizeRequest>(r#"{"speaker": "Ryan"}"#).is_err());
    }

    #[tokio::test]
    async fn test_run_inference_returns_result() {
        let limiter = Arc::new(Semaphore::new(1));
        let out = run_inference(&limiter, Duration::from_secs(1), || Ok(42)).await;
        assert_eq!(out.unwrap(), 42);
        assert_eq!(limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_run_inference_timeout_keeps_permit_until_worker_done() {
        let limiter = Arc::new(Semaphore::new(1));
        let result: Result<(), AppError> =
            run_inference(&limiter, Duration::from_millis(10), || {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(AppError::Timeout)));

        // The worker is still running, so its slot stays occupied
        assert_eq!(limiter.available_permits(), 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_run_inference_propagates_worker_error() {
        let limiter = Arc::new(Semaphore::new(1));
        let result: Result<(), AppError> =
            run_inference(&limiter, Duration::from_secs(1), || {
                Err(AppError::InferenceError("boom".into()))
            })
            .await;
        assert!(matches!(result, Err(AppError::InferenceError(_))));
    }
}

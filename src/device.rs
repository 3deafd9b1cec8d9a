//! Compute device selection for ONNX sessions.

/// Report which device inference will run on.
///
/// CUDA is only probed when the `cuda` feature is enabled; otherwise
/// everything runs on CPU through the default execution provider.
pub fn detect() -> &'static str {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
        if CUDAExecutionProvider::default()
            .is_available()
            .unwrap_or(false)
        {
            return "cuda";
        }
    }
    "cpu"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_returns_known_device() {
        let device = detect();
        assert!(device == "cpu" || device == "cuda");
    }
}

//! ONNX acoustic model wrapper.

use std::path::Path;
use std::sync::Mutex;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;

use crate::error::AppError;

/// CTC acoustic model session.
///
/// Input: `audio_signal` `[1, n_mels, frames]` (f32) and `length` `[1]`
/// (i64). Output: frame-level log-probabilities `[1, frames', vocab]`.
pub struct SttEngine {
    session: Mutex<Session>,
}

impl SttEngine {
    pub fn load(model_path: &Path) -> Result<Self, AppError> {
        let builder = Session::builder()
            .map_err(|e| AppError::ModelError(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| AppError::ModelError(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| AppError::ModelError(format!("Failed to set threads: {}", e)))?;

        #[cfg(feature = "cuda")]
        let builder = builder
            .with_execution_providers([
                ort::execution_providers::CUDAExecutionProvider::default().build(),
            ])
            .map_err(|e| AppError::ModelError(format!("Failed to register CUDA: {}", e)))?;

        let mut builder = builder;
        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| AppError::ModelError(format!("Failed to load model: {}", e)))?;

        Ok(Self {
            session: Mutex::new(session),
        })
    }

    /// Run the model over extracted features and greedy-decode per frame.
    ///
    /// Returns the raw frame-level argmax IDs; CTC collapse happens in the
    /// token decoder.
    pub fn recognize(&self, features: &[Vec<f32>]) -> Result<Vec<usize>, AppError> {
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let frames = features.len();
        let n_mels = features[0].len();

        // Model expects [batch, n_mels, time]: transpose frame-major features
        let mut signal = vec![0.0f32; n_mels * frames];
        for (t, frame) in features.iter().enumerate() {
            for (m, v) in frame.iter().enumerate() {
                signal[m * frames + t] = *v;
            }
        }

        let signal_value = Value::from_array((vec![1, n_mels, frames], signal))
            .map_err(|e| AppError::InferenceError(format!("Failed to create input tensor: {}", e)))?;
        let length_value = Value::from_array((vec![1], vec![frames as i64]))
            .map_err(|e| AppError::InferenceError(format!("Failed to create length tensor: {}", e)))?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![
                "audio_signal" => signal_value,
                "length" => length_value
            ])
            .map_err(|e| AppError::InferenceError(format!("Inference failed: {}", e)))?;

        let logits = outputs
            .get("logprobs")
            .or_else(|| outputs.get("outputs"))
            .ok_or_else(|| AppError::InferenceError("Missing logits tensor".into()))?;

        let (shape, data) = logits
            .try_extract_tensor::<f32>()
            .map_err(|e| AppError::InferenceError(format!("Failed to extract logits: {}", e)))?;

        if shape.len() != 3 {
            return Err(AppError::InferenceError(format!(
                "Unexpected logits rank: {:?}",
                shape
            )));
        }

        let steps = shape[1] as usize;
        let vocab = shape[2] as usize;

        let ids = (0..steps)
            .map(|t| argmax(&data[t * vocab..(t + 1) * vocab]))
            .collect();

        Ok(ids)
    }
}

fn argmax(row: &[f32]) -> usize {
    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (i, &score) in row.iter().enumerate() {
        if score > best_score {
            best = i;
            best_score = score;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.9, 0.3]), 1);
        assert_eq!(argmax(&[2.0]), 0);
    }

    #[test]
    fn test_argmax_negative_scores() {
        assert_eq!(argmax(&[-5.0, -1.0, -3.0]), 1);
    }
}

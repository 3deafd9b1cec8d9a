pub mod engine;
pub mod features;
pub mod tokens;

use std::path::Path;

use serde::Deserialize;

use crate::audio;
use crate::error::AppError;

pub use engine::SttEngine;
pub use features::{FeatureConfig, FeatureExtractor};
pub use tokens::TokenDecoder;

/// Optional per-model settings, read from `config.json` in the model
/// directory when present.
#[derive(Debug, Clone, Deserialize)]
pub struct SttModelConfig {
    #[serde(default = "default_n_mels")]
    pub n_mels: usize,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_n_mels() -> usize {
    80
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for SttModelConfig {
    fn default() -> Self {
        Self {
            n_mels: default_n_mels(),
            language: default_language(),
        }
    }
}

/// Completed transcription of one upload.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
    pub language: String,
    pub duration_secs: f32,
}

/// One loaded recognition model plus its vocabulary.
pub struct SttService {
    engine: SttEngine,
    decoder: TokenDecoder,
    config: SttModelConfig,
}

impl SttService {
    /// Load a model directory containing `model.onnx`, `tokens.txt` and an
    /// optional `config.json`.
    pub fn load(model_dir: &Path) -> Result<Self, AppError> {
        let config = load_config(&model_dir.join("config.json"))?;
        let engine = SttEngine::load(&model_dir.join("model.onnx"))?;
        let decoder = TokenDecoder::from_file(&model_dir.join("tokens.txt"))?;

        tracing::info!(
            "Loaded STT model from {} ({} tokens, {} mel bins)",
            model_dir.display(),
            decoder.vocab_size(),
            config.n_mels
        );

        Ok(Self {
            engine,
            decoder,
            config,
        })
    }

    /// Transcribe an uploaded audio payload.
    pub fn transcribe(
        &self,
        bytes: &[u8],
        language_hint: Option<&str>,
    ) -> Result<Transcription, AppError> {
        // 1. Decode to 16 kHz mono
        let decoded = audio::decode(bytes)?;

        // 2. Extract log-mel features
        let mut extractor = FeatureExtractor::with_mel_bins(self.config.n_mels);
        let features = extractor.extract(&decoded.samples)?;

        // 3. Acoustic model + greedy CTC
        let ids = self.engine.recognize(&features)?;

        // 4. Detokenize
        let text = self.decoder.decode(&ids)?;

        let language = language_hint
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.config.language)
            .to_string();

        Ok(Transcription {
            text,
            language,
            duration_secs: decoded.duration_secs,
        })
    }
}

fn load_config(path: &Path) -> Result<SttModelConfig, AppError> {
    if !path.exists() {
        return Ok(SttModelConfig::default());
    }
    let config = serde_json::from_reader(std::fs::File::open(path)?)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: SttModelConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.n_mels, 80);
        assert_eq!(config.language, "en");
    }

    #[test]
    fn test_config_overrides() {
        let config: SttModelConfig =
            serde_json::from_str(r#"{"n_mels": 128, "language": "de"}"#).unwrap();
        assert_eq!(config.n_mels, 128);
        assert_eq!(config.language, "de");
    }
}

use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    pub audio: AudioConfig,
    pub espeak: Option<EspeakConfig>,
    #[serde(default)]
    pub phoneme_id_map: HashMap<String, Vec<i64>>,
    #[serde(default)]
    pub inference: Option<InferenceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EspeakConfig {
    pub voice: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f32,
    #[serde(default = "default_length_scale")]
    pub length_scale: f32,
    #[serde(default = "default_noise_w")]
    pub noise_w: f32,
}

fn default_noise_scale() -> f32 {
    0.667
}

fn default_length_scale() -> f32 {
    1.0
}

fn default_noise_w() -> f32 {
    0.8
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            noise_scale: default_noise_scale(),
            length_scale: default_length_scale(),
            noise_w: default_noise_w(),
        }
    }
}

/// One speaker's voice model on disk: `<Speaker>.onnx` + `<Speaker>.onnx.json`.
#[derive(Debug)]
pub struct Voice {
    #[allow(dead_code)]
    pub speaker: String,
    pub config: VoiceConfig,
    pub model_path: PathBuf,
}

impl Voice {
    pub fn load(voices_dir: &Path, speaker: &str) -> Result<Self, AppError> {
        let model_path = voices_dir.join(format!("{}.onnx", speaker));
        let config_path = voices_dir.join(format!("{}.onnx.json", speaker));

        if !model_path.exists() {
            return Err(AppError::SpeakerNotFound(speaker.to_string()));
        }

        if !config_path.exists() {
            return Err(AppError::SpeakerNotFound(format!(
                "{} (missing config file)",
                speaker
            )));
        }

        let config: VoiceConfig = serde_json::from_reader(File::open(&config_path)?)?;

        Ok(Self {
            speaker: speaker.to_string(),
            config,
            model_path,
        })
    }

    /// Phonemizer voice for a request: the named language wins, `Auto`
    /// falls back to whatever the voice model was trained with.
    pub fn espeak_voice(&self, language: &str) -> Result<&'static str, AppError> {
        let trained = self
            .config
            .espeak
            .as_ref()
            .map(|e| e.voice.as_str())
            .unwrap_or("en-us");

        if language.eq_ignore_ascii_case("auto") {
            return Ok(espeak_voice_for_code(trained).unwrap_or("en-us"));
        }

        espeak_voice_for_language(language).ok_or_else(|| {
            AppError::BadRequest(format!("Unsupported language: '{}'", language))
        })
    }
}

/// Language names accepted by `/synthesize`, mapped to espeak-ng voices.
const LANGUAGES: &[(&str, &str)] = &[
    ("english", "en-us"),
    ("chinese", "cmn"),
    ("german", "de"),
    ("italian", "it"),
    ("portuguese", "pt"),
    ("spanish", "es"),
    ("japanese", "ja"),
    ("korean", "ko"),
    ("french", "fr-fr"),
    ("russian", "ru"),
];

pub fn espeak_voice_for_language(language: &str) -> Option<&'static str> {
    let lower = language.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, voice)| *voice)
}

fn espeak_voice_for_code(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(_, voice)| *voice == code)
        .map(|(_, voice)| *voice)
}

/// Scan the voices directory for installed speakers.
pub fn list_speakers(voices_dir: &Path) -> Result<Vec<String>, AppError> {
    let mut speakers = Vec::new();

    if !voices_dir.exists() {
        return Ok(speakers);
    }

    for entry in std::fs::read_dir(voices_dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.extension().map(|e| e == "onnx").unwrap_or(false) {
            if let Some(stem) = path.file_stem() {
                speakers.push(stem.to_string_lossy().to_string());
            }
        }
    }

    speakers.sort();
    Ok(speakers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_lookup_case_insensitive() {
        assert_eq!(espeak_voice_for_language("English"), Some("en-us"));
        assert_eq!(espeak_voice_for_language("FRENCH"), Some("fr-fr"));
    }

    #[test]
    fn test_unknown_language() {
        assert_eq!(espeak_voice_for_language("Klingon"), None);
    }

    #[test]
    fn test_inference_defaults() {
        let config: InferenceConfig = serde_json::from_str("{}").unwrap();
        assert!((config.noise_scale - 0.667).abs() < 1e-6);
        assert!((config.length_scale - 1.0).abs() < 1e-6);
        assert!((config.noise_w - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_missing_speaker() {
        let err = Voice::load(Path::new("/nonexistent"), "Ryan").unwrap_err();
        assert!(matches!(err, AppError::SpeakerNotFound(_)));
    }

    #[test]
    fn test_list_speakers_missing_dir() {
        let speakers = list_speakers(Path::new("/nonexistent")).unwrap();
        assert!(speakers.is_empty());
    }
}

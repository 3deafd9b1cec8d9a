pub mod engine;
pub mod style;
pub mod voice;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::audio;
use crate::error::AppError;

pub use engine::VitsEngine;
pub use voice::{Voice, VoiceConfig};

/// Synthesis service: a voices directory plus per-speaker engine cache.
///
/// The default speaker is preloaded at startup; other speakers load on
/// first request and stay cached for the life of the process.
pub struct TtsService {
    voices_dir: PathBuf,
    engines: RwLock<HashMap<String, Arc<VitsEngine>>>,
}

impl TtsService {
    pub fn new(voices_dir: PathBuf) -> Self {
        Self {
            voices_dir,
            engines: RwLock::new(HashMap::new()),
        }
    }

    /// Load the given speaker's model eagerly. Used at startup so the first
    /// request doesn't pay the model-load cost.
    pub fn preload(&self, speaker: &str) -> Result<(), AppError> {
        self.get_engine(speaker)?;
        Ok(())
    }

    /// Speakers installed in the voices directory.
    pub fn speakers(&self) -> Result<Vec<String>, AppError> {
        voice::list_speakers(&self.voices_dir)
    }

    /// Synthesize WAV bytes for a request.
    pub fn synthesize(
        &self,
        text: &str,
        speaker: &str,
        language: &str,
        instruct: &str,
    ) -> Result<Vec<u8>, AppError> {
        // Unknown language is a client error regardless of the speaker
        if !language.eq_ignore_ascii_case("auto")
            && voice::espeak_voice_for_language(language).is_none()
        {
            return Err(AppError::BadRequest(format!(
                "Unsupported language: '{}'",
                language
            )));
        }

        // 1. Resolve speaker and engine
        let voice = Voice::load(&self.voices_dir, speaker)?;
        let engine = self.get_engine(speaker)?;

        // 2. Style from instruct, applied to the voice's scales
        let base = voice.config.inference.clone().unwrap_or_default();
        let scales = style::parse(instruct).apply(&base);

        // 3. Phonemize in the requested language
        let espeak_voice = voice.espeak_voice(language)?;
        let phonemes = engine::phonemize(text, espeak_voice)?;

        // 4. Convert to IDs
        let ids = engine::phonemes_to_ids(&phonemes, &voice.config.phoneme_id_map);

        // 5. Synthesize
        let samples = engine.synthesize(&ids, &scales)?;

        // 6. Encode WAV
        let wav = audio::samples_to_wav(&samples, voice.config.audio.sample_rate)?;

        Ok(wav)
    }

    fn get_engine(&self, speaker: &str) -> Result<Arc<VitsEngine>, AppError> {
        {
            let engines = self.engines.read().unwrap();
            if let Some(engine) = engines.get(speaker) {
                return Ok(Arc::clone(engine));
            }
        }

        let voice = Voice::load(&self.voices_dir, speaker)?;
        let engine = Arc::new(VitsEngine::new(&voice)?);

        {
            let mut engines = self.engines.write().unwrap();
            engines.insert(speaker.to_string(), Arc::clone(&engine));
        }

        Ok(engine)
    }
}

//! Synthesize-then-transcribe round trip against real model weights.
//!
//! Opt-in: set `SPEECH_TEST_MODEL_DIR` (STT model directory) and
//! `SPEECH_TEST_VOICES_DIR` (TTS voices directory). Without them the test
//! skips, so the suite stays green on machines without weights.

use std::path::PathBuf;

use speech_server::stt::SttService;
use speech_server::tts::TtsService;

fn weights() -> Option<(PathBuf, PathBuf)> {
    let model_dir = std::env::var("SPEECH_TEST_MODEL_DIR").ok()?;
    let voices_dir = std::env::var("SPEECH_TEST_VOICES_DIR").ok()?;
    Some((PathBuf::from(model_dir), PathBuf::from(voices_dir)))
}

#[test]
fn synthesized_speech_transcribes_back() {
    let Some((model_dir, voices_dir)) = weights() else {
        println!("Skipping round-trip test - model weights not configured");
        return;
    };

    let input = "the quick brown fox jumps over the lazy dog";

    let tts = TtsService::new(voices_dir);
    let wav = tts
        .synthesize(input, "Ryan", "English", "")
        .expect("synthesis failed");
    assert!(wav.starts_with(b"RIFF"));
    assert!(wav.len() > 44);

    let stt = SttService::load(&model_dir).expect("STT model load failed");
    let result = stt.transcribe(&wav, Some("en")).expect("transcription failed");

    assert!(!result.text.is_empty());
    assert!(result.duration_secs > 0.0);
    assert_eq!(result.language, "en");

    // Semantic, not byte-exact: most input words should survive the trip
    let transcript = result.text.to_lowercase();
    let matched = input
        .split_whitespace()
        .filter(|w| transcript.contains(w))
        .count();
    assert!(
        matched * 2 >= input.split_whitespace().count(),
        "transcript '{}' diverged from input",
        transcript
    );
}

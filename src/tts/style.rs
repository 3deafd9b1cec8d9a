//! Instruct parsing.
//!
//! The `instruct` field is free text steering delivery ("speak slowly and
//! calmly"). Recognized keywords adjust the voice's inference scales;
//! everything else is ignored.

use lazy_static::lazy_static;
use regex::Regex;

use crate::tts::voice::InferenceConfig;

/// Multipliers applied on top of a voice's inference scales.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleParams {
    /// Speaking-rate multiplier on `length_scale` (>1 is slower)
    pub rate: f32,
    /// Multiplier on `noise_scale` (pitch/energy variability)
    pub variability: f32,
    /// Multiplier on `noise_w` (phoneme duration variability)
    pub duration_spread: f32,
}

impl Default for StyleParams {
    fn default() -> Self {
        Self {
            rate: 1.0,
            variability: 1.0,
            duration_spread: 1.0,
        }
    }
}

lazy_static! {
    static ref WORD_REGEX: Regex = Regex::new(r"[a-z']+").unwrap();
}

/// Parse an instruct string into style multipliers.
pub fn parse(instruct: &str) -> StyleParams {
    let mut style = StyleParams::default();
    if instruct.is_empty() {
        return style;
    }

    let lower = instruct.to_ascii_lowercase();
    for word in WORD_REGEX.find_iter(&lower) {
        match word.as_str() {
            "slow" | "slowly" | "calm" | "calmly" | "gentle" | "gently" => {
                style.rate *= 1.15;
            }
            "fast" | "quick" | "quickly" | "hurried" | "rushed" => {
                style.rate *= 0.85;
            }
            "excited" | "energetic" | "enthusiastic" => {
                style.rate *= 0.9;
                style.variability *= 1.15;
            }
            "whisper" | "whispering" | "soft" | "softly" | "quiet" | "quietly" => {
                style.variability *= 0.7;
            }
            "dramatic" | "expressive" | "emotional" | "animated" => {
                style.variability *= 1.25;
                style.duration_spread *= 1.1;
            }
            "monotone" | "flat" | "neutral" | "robotic" => {
                style.variability *= 0.5;
                style.duration_spread *= 0.8;
            }
            _ => {}
        }
    }

    style.rate = style.rate.clamp(0.5, 2.0);
    style.variability = style.variability.clamp(0.25, 2.0);
    style.duration_spread = style.duration_spread.clamp(0.5, 1.5);
    style
}

impl StyleParams {
    /// Apply the multipliers to a voice's configured scales.
    pub fn apply(&self, base: &InferenceConfig) -> InferenceConfig {
        InferenceConfig {
            noise_scale: base.noise_scale * self.variability,
            length_scale: base.length_scale * self.rate,
            noise_w: base.noise_w * self.duration_spread,
        }
    }
}

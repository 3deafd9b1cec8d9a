//! Log-mel filterbank feature extraction.
//!
//! Produces the `[num_frames, n_mels]` features the acoustic model expects:
//! 25 ms Hamming-windowed frames with a 10 ms hop at 16 kHz, power spectrum
//! via rustfft, mel filterbank, natural log, per-bin normalization.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

use crate::error::AppError;

/// Feature extractor configuration
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    pub sample_rate: usize,
    /// Number of mel bins
    pub n_mels: usize,
    /// Frame length in samples (25 ms at 16 kHz)
    pub frame_length: usize,
    /// Frame shift in samples (10 ms at 16 kHz)
    pub frame_shift: usize,
    pub fft_size: usize,
    pub f_min: f32,
    pub f_max: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            n_mels: 80,
            frame_length: 400,
            frame_shift: 160,
            fft_size: 512,
            f_min: 0.0,
            f_max: 8000.0,
        }
    }
}

pub struct FeatureExtractor {
    config: FeatureConfig,
    mel_banks: Vec<Vec<f32>>,
    planner: FftPlanner<f32>,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        let mel_banks = create_mel_filterbank(&config);
        Self {
            config,
            mel_banks,
            planner: FftPlanner::new(),
        }
    }

    pub fn with_mel_bins(n_mels: usize) -> Self {
        Self::new(FeatureConfig {
            n_mels,
            ..FeatureConfig::default()
        })
    }

    /// Extract normalized log-mel features from 16 kHz mono samples.
    ///
    /// Audio shorter than one frame is zero-padded to `frame_length` so any
    /// decodable upload yields at least one frame.
    pub fn extract(&mut self, audio: &[f32]) -> Result<Vec<Vec<f32>>, AppError> {
        if audio.is_empty() {
            return Err(AppError::AudioError("Audio is empty".into()));
        }

        let padded;
        let audio = if audio.len() < self.config.frame_length {
            let mut samples = audio.to_vec();
            samples.resize(self.config.frame_length, 0.0);
            padded = samples;
            &padded[..]
        } else {
            audio
        };

        let num_frames = (audio.len() - self.config.frame_length) / self.config.frame_shift + 1;
        let fft = self.planner.plan_fft_forward(self.config.fft_size);
        let n_bins = self.config.fft_size / 2 + 1;

        let mut features = Vec::with_capacity(num_frames);
        let mut buffer = vec![Complex::new(0.0f32, 0.0f32); self.config.fft_size];

        for i in 0..num_frames {
            let start = i * self.config.frame_shift;
            let frame = &audio[start..start + self.config.frame_length];

            // Hamming window, zero-padded to fft_size
            for (j, slot) in buffer.iter_mut().enumerate() {
                *slot = if j < frame.len() {
                    let w = 0.54
                        - 0.46 * (2.0 * PI * j as f32 / (frame.len() as f32 - 1.0)).cos();
                    Complex::new(frame[j] * w, 0.0)
                } else {
                    Complex::new(0.0, 0.0)
                };
            }

            fft.process(&mut buffer);

            let power: Vec<f32> = buffer[..n_bins]
                .iter()
                .map(|c| c.re * c.re + c.im * c.im)
                .collect();

            let mel: Vec<f32> = self
                .mel_banks
                .iter()
                .map(|bank| {
                    let energy: f32 = bank.iter().zip(&power).map(|(w, p)| w * p).sum();
                    (energy + 1e-10).ln()
                })
                .collect();

            features.push(mel);
        }

        normalize_per_bin(&mut features);

        Ok(features)
    }
}

/// Normalize each mel bin to zero mean / unit variance across time
fn normalize_per_bin(features: &mut [Vec<f32>]) {
    if features.is_empty() {
        return;
    }
    let n_frames = features.len() as f32;
    let n_mels = features[0].len();

    for m in 0..n_mels {
        let mean: f32 = features.iter().map(|f| f[m]).sum::<f32>() / n_frames;
        let var: f32 = features.iter().map(|f| (f[m] - mean).powi(2)).sum::<f32>() / n_frames;
        let std = (var + 1e-5).sqrt();
        for frame in features.iter_mut() {
            frame[m] = (frame[m] - mean) / std;
        }
    }
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

fn create_mel_filterbank(config: &FeatureConfig) -> Vec<Vec<f32>> {
    let n_bins = config.fft_size / 2 + 1;
    let mel_min = hz_to_mel(config.f_min);
    let mel_max = hz_to_mel(config.f_max);

    // n_mels + 2 evenly spaced points on the mel scale
    let points: Vec<f32> = (0..config.n_mels + 2)
        .map(|i| {
            let mel = mel_min + (mel_max - mel_min) * i as f32 / (config.n_mels + 1) as f32;
            mel_to_hz(mel)
        })
        .collect();

    let hz_per_bin = config.sample_rate as f32 / config.fft_size as f32;

    let mut banks = Vec::with_capacity(config.n_mels);
    for m in 0..config.n_mels {
        let (left, center, right) = (points[m], points[m + 1], points[m + 2]);
        let mut bank = vec![0.0f32; n_bins];
        for (bin, weight) in bank.iter_mut().enumerate() {
            let hz = bin as f32 * hz_per_bin;
            if hz > left && hz < right {
                *weight = if hz <= center {
                    (hz - left) / (center - left)
                } else {
                    (right - hz) / (right - center)
                };
            }
        }
        banks.push(bank);
    }

    banks
}

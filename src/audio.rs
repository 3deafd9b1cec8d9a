//! Audio decode/encode shared by both services.
//!
//! Uploads are decoded to 16 kHz mono f32 for recognition; synthesis output
//! is encoded as 16-bit mono PCM WAV.

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AppError;

/// Sample rate recognition models expect
pub const STT_SAMPLE_RATE: u32 = 16000;

/// Decoded upload, already downmixed and resampled for recognition.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples at [`STT_SAMPLE_RATE`]
    pub samples: Vec<f32>,
    /// Duration of the original payload in seconds
    pub duration_secs: f32,
}

/// Decode an uploaded audio payload of any supported container.
///
/// WAV goes through hound directly; everything else (MP3, FLAC, OGG) is
/// probed and decoded by symphonia.
pub fn decode(bytes: &[u8]) -> Result<DecodedAudio, AppError> {
    let (samples, sample_rate, channels) = if bytes.starts_with(b"RIFF") {
        decode_wav(bytes)?
    } else {
        decode_with_symphonia(bytes)?
    };

    if samples.is_empty() {
        return Err(AppError::AudioError("Audio contains no samples".into()));
    }

    let mono = downmix(samples, channels);
    let duration_secs = mono.len() as f32 / sample_rate as f32;
    let samples = resample(&mono, sample_rate, STT_SAMPLE_RATE);

    Ok(DecodedAudio {
        samples,
        duration_secs,
    })
}

fn decode_wav(bytes: &[u8]) -> Result<(Vec<f32>, u32, usize), AppError> {
    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| AppError::AudioError(format!("Invalid WAV: {}", e)))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| AppError::AudioError(format!("Failed to read samples: {}", e)))?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<_, _>>()
            .map_err(|e| AppError::AudioError(format!("Failed to read samples: {}", e)))?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2147483648.0))
            .collect::<Result<_, _>>()
            .map_err(|e| AppError::AudioError(format!("Failed to read samples: {}", e)))?,
        (_, bits) => {
            return Err(AppError::AudioError(format!(
                "Unsupported WAV bit depth: {}",
                bits
            )))
        }
    };

    Ok((samples, spec.sample_rate, spec.channels as usize))
}

fn decode_with_symphonia(bytes: &[u8]) -> Result<(Vec<f32>, u32, usize), AppError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AppError::AudioError(format!("Unrecognized audio format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AppError::AudioError("No audio tracks found".into()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AppError::AudioError("Could not determine sample rate".into()))?;
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AppError::AudioError(format!("Failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();
    let mut sample_buf = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(AppError::AudioError(format!(
                    "Failed to read packet: {}",
                    e
                )))
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| AppError::AudioError(format!("Failed to decode: {}", e)))?;

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let capacity = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::<f32>::new(capacity, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    Ok((samples, sample_rate, channels))
}

fn downmix(samples: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples;
    }
    samples
        .chunks(channels)
        .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
        .collect()
}

/// Linear resampling, sufficient for speech-model input
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let new_len = (samples.len() as f64 / ratio).ceil() as usize;
    let mut resampled = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_idx = (i as f64 * ratio) as usize;
        if src_idx < samples.len() {
            resampled.push(samples[src_idx]);
        }
    }

    resampled
}

/// Encode f32 samples as 16-bit mono PCM WAV
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AppError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let cursor = Cursor::new(&mut buffer);
        let mut writer = WavWriter::new(cursor, spec)
            .map_err(|e| AppError::InferenceError(format!("Failed to create WAV writer: {}", e)))?;

        for sample in samples {
            let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(scaled)
                .map_err(|e| AppError::InferenceError(format!("Failed to write sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| AppError::InferenceError(format!("Failed to finalize WAV: {}", e)))?;
    }

    Ok(buffer)
}

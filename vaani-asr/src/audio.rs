//! Waveform decoding and conditioning ahead of feature extraction.
//!
//! The acoustic model expects mono 16kHz audio with trimmed edges and peak
//! amplitude near 1.0. Everything in this module is deterministic per
//! utterance and holds no shared state.

use crate::error::{AudioError, Result};
use hound::{SampleFormat, WavReader};
use rubato::{FftFixedInOut, Resampler};
use std::io::Cursor;
use std::path::Path;

/// Expected sample rate for the acoustic model (16kHz)
pub const SAMPLE_RATE: u32 = 16000;

/// Additive guard against division by zero when normalizing near-silent input.
const PEAK_EPSILON: f32 = 1e-9;

/// Edges quieter than this many dB below the peak frame are trimmed.
const TRIM_TOP_DB: f32 = 20.0;

/// Analysis frame length for edge trimming, in samples.
const TRIM_FRAME_LEN: usize = 2048;

/// Hop between trim analysis frames, in samples.
const TRIM_HOP: usize = 512;

/// Input block size fed to the FFT resampler.
const RESAMPLER_BLOCK: usize = 1024;

/// Decode a WAV container from raw bytes.
///
/// Returns interleaved samples scaled to [-1, 1], the source sample rate,
/// and the channel count.
///
/// # Errors
///
/// Returns error if the bytes are not a decodable WAV stream.
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<(Vec<f32>, u32, u16)> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<hound::Result<_>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<hound::Result<_>>()?
        }
    };

    Ok((samples, spec.sample_rate, spec.channels))
}

/// Decode a WAV file from disk.
///
/// # Errors
///
/// Returns error if the file cannot be read or decoded.
pub fn decode_wav_file<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32, u16)> {
    let bytes = std::fs::read(path)?;
    decode_wav_bytes(&bytes)
}

/// Fold interleaved multi-channel samples to mono by per-frame averaging.
///
/// # Errors
///
/// Returns error for a zero channel count.
pub fn fold_to_mono(samples: Vec<f32>, channels: u16) -> Result<Vec<f32>> {
    match channels {
        0 => Err(AudioError::InvalidChannels(channels).into()),
        1 => Ok(samples),
        n => Ok(samples
            .chunks(n as usize)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()),
    }
}

/// Resample mono audio to 16kHz with band-limited FFT resampling.
///
/// No-op when the source is already at 16kHz. The output length is exactly
/// `round(len * 16000 / src_rate)`; the resampler's inherent delay is
/// compensated by flushing with zero blocks and discarding the leading
/// latency frames.
pub fn resample_to_16k(samples: Vec<f32>, src_rate: u32) -> Result<Vec<f32>> {
    if src_rate == SAMPLE_RATE || samples.is_empty() {
        return Ok(samples);
    }

    let mut resampler = FftFixedInOut::<f32>::new(
        src_rate as usize,
        SAMPLE_RATE as usize,
        RESAMPLER_BLOCK,
        1,
    )?;

    let expected =
        (samples.len() as f64 * SAMPLE_RATE as f64 / src_rate as f64).round() as usize;
    let delay = resampler.output_delay();

    let mut output = Vec::with_capacity(expected + delay);
    let mut input = vec![0.0f32; resampler.input_frames_next()];
    let mut fed = 0;

    while output.len() < expected + delay {
        let block = resampler.input_frames_next();
        input.resize(block, 0.0);

        let take = block.min(samples.len().saturating_sub(fed));
        input[..take].copy_from_slice(&samples[fed..fed + take]);
        input[take..].fill(0.0);
        fed += take;

        let out = resampler.process(&[&input], None)?;
        output.extend_from_slice(&out[0]);
    }

    output.drain(..delay);
    output.truncate(expected);
    Ok(output)
}

/// Trim leading and trailing regions more than 20dB quieter than the peak.
///
/// Frame energies are compared against the loudest frame; everything before
/// the first and after the last frame above the threshold is dropped. Pure
/// silence yields an empty vec, never an error.
pub fn trim_silence(samples: &[f32]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let frame_power = |frame: &[f32]| -> f32 {
        frame.iter().map(|&x| x * x).sum::<f32>() / frame.len() as f32
    };

    let num_frames = samples.len().div_ceil(TRIM_HOP);
    let powers: Vec<f32> = (0..num_frames)
        .map(|i| {
            let start = i * TRIM_HOP;
            let end = (start + TRIM_FRAME_LEN).min(samples.len());
            frame_power(&samples[start..end])
        })
        .collect();

    let peak = powers.iter().copied().fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return Vec::new();
    }

    let threshold = peak * 10.0f32.powf(-TRIM_TOP_DB / 10.0);
    let first = powers.iter().position(|&p| p > threshold);
    let last = powers.iter().rposition(|&p| p > threshold);

    match (first, last) {
        (Some(first), Some(last)) => {
            let start = first * TRIM_HOP;
            let end = ((last + 1) * TRIM_HOP).min(samples.len());
            samples[start..end].to_vec()
        }
        _ => Vec::new(),
    }
}

/// Scale samples so the peak magnitude is approximately 1.
///
/// Divides by `max(|x|) + epsilon`, which keeps near-silent input finite
/// instead of dividing by zero.
pub fn peak_normalize(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
    let scale = 1.0 / (peak + PEAK_EPSILON);
    for sample in samples.iter_mut() {
        *sample *= scale;
    }
}

/// Full conditioning chain: mono fold, resample to 16kHz, edge trim, peak
/// normalization.
///
/// A fully silent input conditions to an empty waveform; downstream stages
/// treat that as a zero-frame utterance rather than an error.
pub fn condition(samples: Vec<f32>, src_rate: u32, channels: u16) -> Result<Vec<f32>> {
    let mono = fold_to_mono(samples, channels)?;
    let resampled = resample_to_16k(mono, src_rate)?;
    let mut trimmed = trim_silence(&resampled);
    peak_normalize(&mut trimmed);

    tracing::debug!(
        samples = trimmed.len(),
        secs = trimmed.len() as f32 / SAMPLE_RATE as f32,
        "audio conditioned"
    );

    Ok(trimmed)
}

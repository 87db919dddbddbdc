//! Log-mel feature extraction matching the acoustic model's training frontend.
//!
//! The output convention is fixed by the model export: 80 mel bands over
//! 1024-point spectra with a 400-sample Hann window and 160-sample hop,
//! log-compressed relative to the utterance peak and mean-variance
//! normalized per band. Deviating from any of these silently degrades
//! recognition, so the constants live in one place.

use crate::error::{FeatureError, Result};
use ndarray::{Array2, Axis};
use rustfft::{FftPlanner, num_complex::Complex};
use std::f32::consts::PI;

/// Power floor for log compression.
const AMIN: f32 = 1e-10;

/// Dynamic range kept below the peak, in dB.
const TOP_DB: f32 = 80.0;

/// Additive guard for constant bands during normalization.
const CMVN_EPSILON: f32 = 1e-9;

/// Spectral analysis parameters for the mel frontend.
#[derive(Clone, Debug)]
pub struct FeatureConfig {
    pub sample_rate: usize,
    pub n_mels: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub win_length: usize,
}

impl FeatureConfig {
    /// Conformer CTC frontend (80 mel bands, 10ms hop, 25ms window).
    pub const CONFORMER: Self = Self {
        sample_rate: 16000,
        n_mels: 80,
        n_fft: 1024,
        hop_length: 160,
        win_length: 400,
    };

    /// Number of frames produced for a waveform of `len` samples.
    ///
    /// Waveforms shorter than one analysis window produce zero frames.
    pub fn frame_count(&self, len: usize) -> usize {
        if len < self.win_length {
            0
        } else {
            (len - self.win_length) / self.hop_length + 1
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self::CONFORMER
    }
}

/// Extract a normalized log-mel feature matrix from a conditioned waveform.
///
/// Returns the `(n_mels, T)` matrix and the frame count `T`. An empty or
/// sub-window waveform yields `T = 0` with an empty matrix; that is a valid
/// zero-frame utterance, not an error.
///
/// # Errors
///
/// Returns [`FeatureError`] if any numeric stage produces non-finite values.
pub fn extract(waveform: &[f32], config: &FeatureConfig) -> Result<(Array2<f32>, usize)> {
    let frames = config.frame_count(waveform.len());
    if frames == 0 {
        return Ok((Array2::zeros((config.n_mels, 0)), 0));
    }

    let spectrogram = stft_power(waveform, config);
    let filterbank = mel_filterbank(config);

    let mel = filterbank.dot(&spectrogram);
    let mut mel = power_to_db(mel);
    if !mel.iter().all(|v| v.is_finite()) {
        return Err(FeatureError::NonFinite {
            stage: "log compression",
        }
        .into());
    }

    normalize_bands(&mut mel);
    if !mel.iter().all(|v| v.is_finite()) {
        return Err(FeatureError::NonFinite {
            stage: "band normalization",
        }
        .into());
    }

    tracing::trace!(frames, bands = config.n_mels, "mel features extracted");

    Ok((mel, frames))
}

/// Hann window of the given length.
fn hann_window(window_length: usize) -> Vec<f32> {
    (0..window_length)
        .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / (window_length as f32 - 1.0)).cos())
        .collect()
}

/// Short-time power spectrogram over `(n_fft / 2 + 1, T)` bins.
///
/// Each window is zero-padded from `win_length` up to `n_fft` before the
/// transform.
fn stft_power(waveform: &[f32], config: &FeatureConfig) -> Array2<f32> {
    let window = hann_window(config.win_length);
    let num_frames = config.frame_count(waveform.len());
    let freq_bins = config.n_fft / 2 + 1;
    let mut spectrogram = Array2::<f32>::zeros((freq_bins, num_frames));

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(config.n_fft);

    let mut frame: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); config.n_fft];

    for frame_idx in 0..num_frames {
        let start = frame_idx * config.hop_length;

        frame.fill(Complex::new(0.0, 0.0));
        for i in 0..config.win_length.min(waveform.len() - start) {
            frame[i] = Complex::new(waveform[start + i] * window[i], 0.0);
        }

        fft.process(&mut frame);

        for k in 0..freq_bins {
            let magnitude = frame[k].norm();
            spectrogram[[k, frame_idx]] = magnitude * magnitude;
        }
    }

    spectrogram
}

/// Convert frequency in Hz to mel scale.
fn hz_to_mel(freq: f32) -> f32 {
    2595.0 * (1.0 + freq / 700.0).log10()
}

/// Convert mel scale to frequency in Hz.
fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank over `(n_mels, n_fft / 2 + 1)`.
fn mel_filterbank(config: &FeatureConfig) -> Array2<f32> {
    let freq_bins = config.n_fft / 2 + 1;
    let n_mels = config.n_mels;
    let mut filterbank = Array2::<f32>::zeros((n_mels, freq_bins));

    let min_mel = hz_to_mel(0.0);
    let max_mel = hz_to_mel(config.sample_rate as f32 / 2.0);

    let mel_points: Vec<f32> = (0..=n_mels + 1)
        .map(|i| mel_to_hz(min_mel + (max_mel - min_mel) * i as f32 / (n_mels + 1) as f32))
        .collect();

    let freq_bin_width = config.sample_rate as f32 / config.n_fft as f32;

    for mel_idx in 0..n_mels {
        let left = mel_points[mel_idx];
        let center = mel_points[mel_idx + 1];
        let right = mel_points[mel_idx + 2];

        for freq_idx in 0..freq_bins {
            let freq = freq_idx as f32 * freq_bin_width;

            if freq >= left && freq <= center {
                filterbank[[mel_idx, freq_idx]] = (freq - left) / (center - left);
            } else if freq > center && freq <= right {
                filterbank[[mel_idx, freq_idx]] = (right - freq) / (right - center);
            }
        }
    }

    filterbank
}

/// Log-compress a power matrix to dB referenced to its peak value.
///
/// The loudest bin maps to 0dB and everything else is negative, floored at
/// `TOP_DB` below the peak.
fn power_to_db(mut power: Array2<f32>) -> Array2<f32> {
    let ref_power = power.iter().copied().fold(AMIN, f32::max);
    let ref_db = 10.0 * ref_power.log10();

    power.mapv_inplace(|p| 10.0 * p.max(AMIN).log10() - ref_db);

    let peak = power.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - TOP_DB;
    power.mapv_inplace(|v| v.max(floor));

    power
}

/// Per-band mean-variance normalization across time (per-utterance CMVN).
fn normalize_bands(mel: &mut Array2<f32>) {
    let frames = mel.ncols();

    for mut band in mel.axis_iter_mut(Axis(0)) {
        let mean = band.iter().sum::<f32>() / frames as f32;
        let variance = band.iter().map(|&x| (x - mean).powi(2)).sum::<f32>() / frames as f32;
        let std = variance.sqrt();

        for val in band.iter_mut() {
            *val = (*val - mean) / (std + CMVN_EPSILON);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI as PI_F32;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI_F32 * freq * i as f32 / 16000.0).sin())
            .collect()
    }

    #[test]
    fn output_shape_follows_frame_law() {
        let config = FeatureConfig::CONFORMER;
        let waveform = sine(440.0, 16000);

        let (features, frames) = extract(&waveform, &config).unwrap();

        let expected = (16000 - 400) / 160 + 1;
        assert_eq!(frames, expected);
        assert_eq!(features.shape(), &[80, expected]);
    }

    #[test]
    fn sub_window_input_yields_zero_frames() {
        let config = FeatureConfig::CONFORMER;

        let (features, frames) = extract(&sine(440.0, 399), &config).unwrap();

        assert_eq!(frames, 0);
        assert_eq!(features.shape(), &[80, 0]);
    }

    #[test]
    fn empty_input_yields_zero_frames() {
        let config = FeatureConfig::CONFORMER;

        let (features, frames) = extract(&[], &config).unwrap();

        assert_eq!(frames, 0);
        assert_eq!(features.shape(), &[80, 0]);
    }

    #[test]
    fn output_is_finite() {
        let config = FeatureConfig::CONFORMER;

        let (features, _) = extract(&sine(440.0, 8000), &config).unwrap();

        assert!(features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn extraction_is_scale_invariant() {
        let config = FeatureConfig::CONFORMER;
        let waveform = sine(440.0, 8000);
        let scaled: Vec<f32> = waveform.iter().map(|&x| x * 3.7).collect();

        let (a, _) = extract(&waveform, &config).unwrap();
        let (b, _) = extract(&scaled, &config).unwrap();

        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-3, "{x} vs {y}");
        }
    }

    #[test]
    fn constant_input_is_finite_after_cmvn() {
        let config = FeatureConfig::CONFORMER;
        let waveform = vec![0.5f32; 8000];

        let (features, _) = extract(&waveform, &config).unwrap();

        assert!(features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn db_compression_references_peak() {
        let power = Array2::from_shape_vec((2, 2), vec![1.0, 0.1, 0.01, 0.001]).unwrap();

        let db = power_to_db(power);

        let max = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!((max - 0.0).abs() < 1e-4);
        assert!(db.iter().all(|&v| v <= 1e-4));
        assert!((db[[0, 1]] + 10.0).abs() < 1e-3);
    }

    #[test]
    fn db_compression_floors_at_top_db() {
        let power = Array2::from_shape_vec((1, 2), vec![1.0, 1e-30]).unwrap();

        let db = power_to_db(power);

        assert!((db[[0, 1]] + TOP_DB).abs() < 1e-3);
    }

    #[test]
    fn normalized_bands_have_zero_mean_unit_variance() {
        let config = FeatureConfig::CONFORMER;

        let (features, frames) = extract(&sine(440.0, 16000), &config).unwrap();

        for band in features.axis_iter(Axis(0)) {
            let mean = band.iter().sum::<f32>() / frames as f32;
            let variance =
                band.iter().map(|&x| (x - mean).powi(2)).sum::<f32>() / frames as f32;
            assert!(mean.abs() < 1e-3);
            // Constant bands normalize to zero variance, others to ~1.
            assert!(variance < 1.01);
        }
    }

    #[test]
    fn filterbank_rows_cover_spectrum() {
        let config = FeatureConfig::CONFORMER;

        let filterbank = mel_filterbank(&config);

        assert_eq!(filterbank.shape(), &[80, 513]);
        for row in filterbank.axis_iter(Axis(0)) {
            assert!(row.iter().any(|&v| v > 0.0));
        }
    }

    #[test]
    fn hann_window_is_symmetric_with_zero_ends() {
        let window = hann_window(400);

        assert!(window[0].abs() < 1e-6);
        assert!(window[399].abs() < 1e-6);
        assert!((window[200] - window[199]).abs() < 1e-3);
    }
}

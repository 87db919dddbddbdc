//! Transcription context tying the acoustic model, vocabulary, and decoder
//! together.
//!
//! The context is constructed once at process start and injected wherever a
//! request needs it; nothing here mutates after construction apart from the
//! ONNX session's internal scratch state.

use crate::audio;
use crate::decoder::{self, DEFAULT_CONFIDENCE_THRESHOLD, TranscriptionResult};
use crate::error::{ConfigError, Result};
use crate::features::{self, FeatureConfig};
use crate::model::AcousticModel;
use crate::vocab::Vocabulary;
use ndarray::Array2;
use ort::session::builder::SessionBuilder;
use std::path::Path;

/// Model file candidates resolved in priority order.
const MODEL_FILES: &[&str] = &["asr_model.onnx", "model.onnx", "model.int8.onnx"];

/// Vocabulary file expected next to the model.
const VOCAB_FILE: &str = "vocab.txt";

/// Tunables for one transcriber instance.
#[derive(Clone, Debug)]
pub struct TranscriberConfig {
    pub features: FeatureConfig,
    pub confidence_threshold: f32,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::CONFORMER,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// End-to-end transcription pipeline over one acoustic model.
pub struct Transcriber {
    model: AcousticModel,
    vocabulary: Vocabulary,
    config: TranscriberConfig,
}

impl Transcriber {
    /// Build a transcriber from already-loaded parts.
    ///
    /// The vocabulary is padded to the model's output width so every output
    /// index resolves to some string.
    pub fn new(model: AcousticModel, mut vocabulary: Vocabulary, config: TranscriberConfig) -> Self {
        if let Some(width) = model.output_width() {
            vocabulary.pad_to_width(width);
        }

        Self {
            model,
            vocabulary,
            config,
        }
    }

    /// Load model and vocabulary from a directory.
    ///
    /// Resolves the first available model file from the candidate list plus
    /// `vocab.txt` alongside it.
    ///
    /// # Errors
    ///
    /// Returns error if no model file exists, the session fails to build, or
    /// the vocabulary cannot be read.
    pub fn from_dir<P: AsRef<Path>>(
        dir: P,
        builder: SessionBuilder,
        config: TranscriberConfig,
    ) -> Result<Self> {
        let dir = dir.as_ref();

        let model_path = MODEL_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| ConfigError::ModelNotFound(dir.display().to_string()))?;

        tracing::info!(model = ?model_path.display(), "loading acoustic model");

        let model = AcousticModel::from_file(&model_path, builder)?;
        let vocabulary = Vocabulary::from_file(dir.join(VOCAB_FILE))?;

        Ok(Self::new(model, vocabulary, config))
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn config(&self) -> &TranscriberConfig {
        &self.config
    }

    /// Transcribe a WAV container from raw bytes.
    ///
    /// # Errors
    ///
    /// Fails fast per stage: undecodable bytes never reach feature
    /// extraction, and a feature failure never reaches inference.
    pub fn transcribe_wav_bytes(&mut self, bytes: &[u8]) -> Result<TranscriptionResult> {
        let (samples, sample_rate, channels) = audio::decode_wav_bytes(bytes)?;
        self.transcribe_samples(samples, sample_rate, channels)
    }

    /// Transcribe raw interleaved samples.
    ///
    /// Conditions the waveform, extracts features, runs inference, and
    /// greedily decodes. A fully silent input short-circuits to an empty
    /// transcription without invoking the model.
    pub fn transcribe_samples(
        &mut self,
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<TranscriptionResult> {
        let waveform = audio::condition(samples, sample_rate, channels)?;
        let (features, length) = features::extract(&waveform, &self.config.features)?;

        tracing::debug!(frames = length, "features extracted");

        let logits = if length == 0 {
            Array2::zeros((0, self.vocabulary.len()))
        } else {
            self.model.forward(features, length)?
        };

        let result = decoder::decode(
            logits.view(),
            &self.vocabulary,
            self.config.confidence_threshold,
        );

        tracing::info!(
            frames = result.confidence.total_tokens,
            low_confidence = result.confidence.low_confidence_tokens,
            chars = result.transcription.len(),
            "utterance decoded"
        );

        Ok(result)
    }
}

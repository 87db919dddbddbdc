//! Error types for vaani-asr organized by processing stage.

use ndarray::ShapeError;
use thiserror::Error;

/// Transcription pipeline error variants organized by processing stage.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration stage error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Audio decoding or conditioning stage error
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Feature extraction stage error
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Model inference stage error
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Configuration errors (model and vocabulary loading).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Model file not found
    #[error("model file not found in: {0}")]
    ModelNotFound(String),

    /// Vocabulary file not found or unreadable
    #[error("vocabulary file not found: {0}")]
    VocabularyNotFound(String),
}

/// Audio loading and conditioning errors.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Channel count validation failed
    #[error("invalid channel count: got {0} channels")]
    InvalidChannels(u16),

    /// IO error during audio loading
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// WAV container or sample format error
    #[error("failed to decode audio: {0}")]
    Wav(#[from] hound::Error),

    /// Resampler could not be constructed for this rate pair
    #[error("failed to construct resampler: {0}")]
    ResamplerConstruction(#[from] rubato::ResamplerConstructionError),

    /// Resampling failed mid-stream
    #[error("failed to resample audio: {0}")]
    Resample(#[from] rubato::ResampleError),
}

/// Feature extraction errors (spectrogram and normalization).
#[derive(Debug, Error)]
pub enum FeatureError {
    /// A numeric stage produced NaN or infinite values
    #[error("non-finite values after {stage}")]
    NonFinite { stage: &'static str },
}

/// Model inference errors (ONNX, ndarray operations).
#[derive(Debug, Error)]
pub enum ModelError {
    /// Missing expected output tensor
    #[error("missing model output: {name}")]
    MissingOutput { name: String },

    /// ONNX Runtime error
    #[error(transparent)]
    Ort(#[from] ort::Error),

    /// ndarray shape error
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Result type alias for vaani-asr operations.
pub type Result<T> = std::result::Result<T, Error>;

// Nested From implementations for automatic error conversion chains

// hound::Error → AudioError → Error
impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::Audio(AudioError::Wav(e))
    }
}

// std::io::Error → AudioError → Error
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Audio(AudioError::Io(e))
    }
}

// rubato construction error → AudioError → Error
impl From<rubato::ResamplerConstructionError> for Error {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        Error::Audio(AudioError::ResamplerConstruction(e))
    }
}

// rubato::ResampleError → AudioError → Error
impl From<rubato::ResampleError> for Error {
    fn from(e: rubato::ResampleError) -> Self {
        Error::Audio(AudioError::Resample(e))
    }
}

// ort::Error → ModelError → Error
impl From<ort::Error> for Error {
    fn from(e: ort::Error) -> Self {
        Error::Model(ModelError::Ort(e))
    }
}

// ShapeError → ModelError → Error
impl From<ShapeError> for Error {
    fn from(e: ShapeError) -> Self {
        Error::Model(ModelError::Shape(e))
    }
}

//! vaani-asr: speech-to-text core for CTC conformer acoustic models.
//!
//! This crate turns a waveform into a transcription plus per-token
//! confidence diagnostics using a pretrained ONNX acoustic model that emits
//! frame-by-frame logits over a fixed vocabulary.
//!
//! # Architecture
//!
//! Two components, consumed in sequence:
//!
//! - [`features`]: deterministic log-mel extraction in the numeric
//!   convention the model was trained on
//! - [`decoder`]: greedy CTC decoding with confidence gating
//!
//! [`transcriber::Transcriber`] wires them to the [`model`] boundary and the
//! [`vocab`] table as one injected, immutable context.
//!
//! # Quick Start
//!
//! ```ignore
//! use ort::session::Session;
//! use vaani_asr::transcriber::{Transcriber, TranscriberConfig};
//!
//! let builder = Session::builder()?;
//! let mut transcriber =
//!     Transcriber::from_dir("model_dir", builder, TranscriberConfig::default())?;
//!
//! let bytes = std::fs::read("utterance.wav")?;
//! let result = transcriber.transcribe_wav_bytes(&bytes)?;
//! println!("{}", result.transcription);
//! ```

pub mod audio;
pub mod decoder;
pub mod error;
pub mod features;
pub mod model;
pub mod transcriber;
pub mod vocab;

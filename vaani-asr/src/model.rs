//! ONNX acoustic model boundary.
//!
//! The model is an opaque function from a feature matrix to per-frame
//! logits. It is loaded once and treated as read-only; `forward` takes
//! `&mut self` only because `ort::Session::run` requires it.

use crate::error::{ModelError, Result};
use ndarray::{Array1, Array2, ArrayViewD, Axis, Ix3};
use ort::inputs;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use ort::value::Value;
use std::path::Path;

/// Name of the feature input tensor in the model export.
const INPUT_SIGNAL: &str = "audio_signal";

/// Name of the frame-count input tensor in the model export.
const INPUT_LENGTH: &str = "length";

/// Acoustic model session producing `(T, V)` logits from `(n_mels, T)`
/// features.
pub struct AcousticModel {
    session: Session,
    output_name: String,
    output_width: Option<usize>,
}

impl AcousticModel {
    /// Load the model from an ONNX file.
    ///
    /// Records the first output tensor's name and, when the export carries a
    /// static shape, its trailing dimension — the vocabulary width used to
    /// reconcile the token table.
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be built or exposes no outputs.
    pub fn from_file<P: AsRef<Path>>(path: P, builder: SessionBuilder) -> Result<Self> {
        let session = builder.commit_from_file(path.as_ref())?;

        let output = session
            .outputs
            .first()
            .ok_or_else(|| ModelError::MissingOutput {
                name: "logits".to_string(),
            })?;

        let output_name = output.name.to_string();
        let output_width = output
            .output_type
            .tensor_shape()
            .and_then(|shape| shape.last().copied())
            .filter(|&dim| dim > 0)
            .map(|dim| dim as usize);

        tracing::debug!(
            output = %output_name,
            width = ?output_width,
            "acoustic model loaded"
        );

        Ok(Self {
            session,
            output_name,
            output_width,
        })
    }

    /// Vocabulary width from session metadata, if the export is static.
    pub fn output_width(&self) -> Option<usize> {
        self.output_width
    }

    /// Run inference over a `(n_mels, T)` feature matrix.
    ///
    /// Feeds `audio_signal = (1, n_mels, T) f32` and `length = (1,) i64`,
    /// returns the first output's inner `(T, V)` logits matrix.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] on any runtime failure; inference is never
    /// retried.
    pub fn forward(&mut self, features: Array2<f32>, length: usize) -> Result<Array2<f32>> {
        let audio_signal = Value::from_array(features.insert_axis(Axis(0)))?;
        let audio_length = Value::from_array(Array1::from_elem((1,), length as i64))?;

        let mut outputs = self.session.run(inputs!(
            INPUT_SIGNAL => audio_signal,
            INPUT_LENGTH => audio_length,
        ))?;

        let logits = outputs
            .remove(self.output_name.as_str())
            .ok_or_else(|| ModelError::MissingOutput {
                name: self.output_name.clone(),
            })?;

        let logits: ArrayViewD<f32> = logits.try_extract_array()?;
        let logits = logits.to_owned().into_dimensionality::<Ix3>()?;

        Ok(logits.index_axis_move(Axis(0), 0))
    }
}

//! Greedy CTC decoding with confidence gating.
//!
//! One left-to-right pass over the logits: per-frame arg-max, low-confidence
//! suppression to blank, repeat/blank collapse against the previous gated id,
//! and running confidence aggregates. The decoder is total: every logits
//! matrix decodes to some result, including the zero-frame one.

use crate::vocab::{BLANK_ID, Vocabulary};
use ndarray::{ArrayView2, Axis};
use ndarray_stats::QuantileExt;
use serde::Serialize;

/// Default raw-logit confidence threshold.
///
/// Frames whose top score is at or below this are suppressed to blank. The
/// comparison is against the raw logit magnitude, not a softmax probability.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = -10.0;

/// Sub-word word-start marker used by the model's tokenization.
const WORD_START_MARKER: char = '\u{2581}';

/// Pipe-like word-boundary marker.
const WORD_BOUNDARY_MARKER: char = '|';

/// Aggregate confidence statistics over one utterance.
///
/// Computed from pre-gate scores: gating changes which id is kept, never the
/// score entering the average, so the summary reflects raw model confidence
/// even where text was suppressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ConfidenceSummary {
    /// Mean per-frame top-1 score; 0.0 for a zero-frame utterance.
    pub average_confidence: f32,
    /// Frames whose top score was at or below the threshold.
    pub low_confidence_tokens: usize,
    /// Total frame count.
    pub total_tokens: usize,
}

/// Decoded utterance: collapsed text, gated per-frame ids, and confidence.
#[derive(Clone, Debug)]
pub struct TranscriptionResult {
    /// CTC-collapsed, separator-normalized text.
    pub transcription: String,
    /// Per-frame token ids after confidence gating, one per input frame.
    pub predicted_ids: Vec<i64>,
    /// Aggregate confidence statistics.
    pub confidence: ConfidenceSummary,
}

/// Greedily decode a `(T, V)` logits matrix against a vocabulary.
///
/// Per frame: take the arg-max id and score, suppress to blank when the
/// score is at or below `confidence_threshold`, then emit the token string
/// only when the gated id differs from the previous frame's gated id, is not
/// blank, and is within vocabulary bounds (out-of-range ids are skipped, not
/// an error). Word markers are rewritten to spaces afterwards.
pub fn decode(
    logits: ArrayView2<'_, f32>,
    vocabulary: &Vocabulary,
    confidence_threshold: f32,
) -> TranscriptionResult {
    let total_tokens = logits.nrows();

    let mut predicted_ids = Vec::with_capacity(total_tokens);
    let mut text = String::new();
    let mut score_sum = 0.0f64;
    let mut low_confidence_tokens = 0;
    let mut prev_id = None;

    for frame in logits.axis_iter(Axis(0)) {
        let (id, score) = match frame.argmax() {
            Ok(id) => (id, frame[id]),
            // Zero-width frame: nothing to rank, count it as a blank.
            Err(_) => (BLANK_ID, 0.0),
        };

        score_sum += f64::from(score);

        let gated = if score <= confidence_threshold {
            low_confidence_tokens += 1;
            BLANK_ID
        } else {
            id
        };

        if prev_id != Some(gated) && gated != BLANK_ID {
            if let Some(token) = vocabulary.token(gated) {
                text.push_str(token);
            }
        }

        prev_id = Some(gated);
        predicted_ids.push(gated as i64);
    }

    let average_confidence = if total_tokens > 0 {
        (score_sum / total_tokens as f64) as f32
    } else {
        0.0
    };

    TranscriptionResult {
        transcription: normalize_separators(&text),
        predicted_ids,
        confidence: ConfidenceSummary {
            average_confidence,
            low_confidence_tokens,
            total_tokens,
        },
    }
}

/// Rewrite sub-word separators to spaces and trim the ends.
fn normalize_separators(text: &str) -> String {
    text.replace(WORD_START_MARKER, " ")
        .replace(WORD_BOUNDARY_MARKER, " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Logits matrix where frame t scores `scores[t].1` for id `scores[t].0`
    /// and `base` everywhere else.
    fn logits_for(width: usize, base: f32, scores: &[(usize, f32)]) -> Array2<f32> {
        let mut logits = Array2::from_elem((scores.len(), width), base);
        for (t, &(id, score)) in scores.iter().enumerate() {
            logits[[t, id]] = score;
        }
        logits
    }

    fn vocab(tokens: &[&str]) -> Vocabulary {
        Vocabulary::new(tokens.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn gates_low_confidence_frames_to_blank() {
        let vocabulary = vocab(&["", "", "", "hi", "", "", "", "lo"]);
        let logits = logits_for(8, -30.0, &[(3, 5.0), (7, -20.0), (3, 5.0)]);

        let result = decode(logits.view(), &vocabulary, DEFAULT_CONFIDENCE_THRESHOLD);

        assert_eq!(result.predicted_ids, vec![3, 0, 3]);
        // The blank gap breaks adjacency, so the repeated id is emitted again.
        assert_eq!(result.transcription, "hihi");
        assert!((result.confidence.average_confidence - (-10.0 / 3.0)).abs() < 1e-4);
        assert_eq!(result.confidence.low_confidence_tokens, 1);
        assert_eq!(result.confidence.total_tokens, 3);
    }

    #[test]
    fn collapses_consecutive_repeats() {
        let vocabulary = vocab(&["", "a", "b"]);
        let logits = logits_for(
            3,
            -5.0,
            &[(1, 4.0), (1, 4.0), (1, 4.0), (2, 4.0), (2, 4.0)],
        );

        let result = decode(logits.view(), &vocabulary, DEFAULT_CONFIDENCE_THRESHOLD);

        assert_eq!(result.transcription, "ab");
        assert_eq!(result.predicted_ids, vec![1, 1, 1, 2, 2]);
    }

    #[test]
    fn blank_frames_are_never_emitted() {
        let vocabulary = vocab(&["<blk>", "a"]);
        let logits = logits_for(2, -5.0, &[(0, 4.0), (1, 4.0), (0, 4.0)]);

        let result = decode(logits.view(), &vocabulary, DEFAULT_CONFIDENCE_THRESHOLD);

        assert_eq!(result.transcription, "a");
    }

    #[test]
    fn all_blank_sequence_yields_empty_transcription() {
        let vocabulary = vocab(&["", "a"]);
        let logits = logits_for(2, -5.0, &[(0, 4.0), (0, 4.0), (0, 4.0)]);

        let result = decode(logits.view(), &vocabulary, DEFAULT_CONFIDENCE_THRESHOLD);

        assert_eq!(result.transcription, "");
        assert_eq!(result.confidence.total_tokens, 3);
    }

    #[test]
    fn zero_frames_yield_empty_result_with_zero_average() {
        let vocabulary = vocab(&["", "a"]);
        let logits = Array2::<f32>::zeros((0, 2));

        let result = decode(logits.view(), &vocabulary, DEFAULT_CONFIDENCE_THRESHOLD);

        assert_eq!(result.transcription, "");
        assert!(result.predicted_ids.is_empty());
        assert_eq!(result.confidence.average_confidence, 0.0);
        assert_eq!(result.confidence.low_confidence_tokens, 0);
        assert_eq!(result.confidence.total_tokens, 0);
    }

    #[test]
    fn out_of_range_ids_are_skipped_without_error() {
        // Model width 9 against an 8-entry vocabulary padded to 9: the
        // padded id emits nothing.
        let mut vocabulary = vocab(&["", "", "", "hi", "", "", "", "lo"]);
        vocabulary.pad_to_width(9);
        let logits = logits_for(9, -5.0, &[(8, 4.0), (3, 4.0)]);

        let result = decode(logits.view(), &vocabulary, DEFAULT_CONFIDENCE_THRESHOLD);

        assert_eq!(result.transcription, "hi");
        assert_eq!(result.predicted_ids, vec![8, 3]);

        // Without padding the id is out of bounds and silently skipped.
        let unpadded = vocab(&["", "", "", "hi", "", "", "", "lo"]);
        let result = decode(logits.view(), &unpadded, DEFAULT_CONFIDENCE_THRESHOLD);

        assert_eq!(result.transcription, "hi");
    }

    #[test]
    fn separators_become_word_spacing() {
        let vocabulary = vocab(&["", "\u{2581}na", "mas", "te", "|"]);
        let logits = logits_for(5, -5.0, &[(1, 4.0), (2, 4.0), (3, 4.0), (4, 4.0)]);

        let result = decode(logits.view(), &vocabulary, DEFAULT_CONFIDENCE_THRESHOLD);

        assert_eq!(result.transcription, "namaste");
    }

    #[test]
    fn collapse_is_idempotent_on_collapsed_sequences() {
        let vocabulary = vocab(&["", "a", "b", "c"]);
        let first = logits_for(4, -5.0, &[(1, 4.0), (1, 4.0), (2, 4.0), (3, 4.0)]);

        let once = decode(first.view(), &vocabulary, DEFAULT_CONFIDENCE_THRESHOLD);

        // Re-decode one frame per collapsed id.
        let again = logits_for(4, -5.0, &[(1, 4.0), (2, 4.0), (3, 4.0)]);
        let twice = decode(again.view(), &vocabulary, DEFAULT_CONFIDENCE_THRESHOLD);

        assert_eq!(once.transcription, "abc");
        assert_eq!(twice.transcription, once.transcription);
    }

    #[test]
    fn gating_count_is_monotone_in_threshold() {
        let vocabulary = vocab(&["", "a", "b"]);
        let logits = logits_for(
            3,
            -30.0,
            &[(1, 5.0), (2, -12.0), (1, -9.0), (2, -20.0), (1, 0.0)],
        );

        let mut prev = 0;
        for threshold in [-25.0, -15.0, -10.0, -5.0, 10.0] {
            let result = decode(logits.view(), &vocabulary, threshold);
            assert!(result.confidence.low_confidence_tokens >= prev);
            prev = result.confidence.low_confidence_tokens;
        }
    }

    #[test]
    fn statistics_use_pre_gate_scores() {
        let vocabulary = vocab(&["", "a"]);
        // Both frames gated to blank, yet the average reflects raw scores.
        let logits = logits_for(2, -40.0, &[(1, -20.0), (1, -30.0)]);

        let result = decode(logits.view(), &vocabulary, DEFAULT_CONFIDENCE_THRESHOLD);

        assert_eq!(result.transcription, "");
        assert_eq!(result.predicted_ids, vec![0, 0]);
        assert!((result.confidence.average_confidence + 25.0).abs() < 1e-4);
        assert_eq!(result.confidence.low_confidence_tokens, 2);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let vocabulary = vocab(&["", "a"]);
        let logits = logits_for(1, -30.0, &[(1, -10.0)]);

        let result = decode(logits.view(), &vocabulary, -10.0);

        // Score equal to the threshold is suppressed.
        assert_eq!(result.predicted_ids, vec![0]);
        assert_eq!(result.confidence.low_confidence_tokens, 1);
    }
}

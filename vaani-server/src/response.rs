//! JSON response shapes for the transcription API.

use serde::Serialize;
use vaani_asr::decoder::{ConfidenceSummary, TranscriptionResult};

/// Success body for `POST /transcribe`.
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub transcription: String,
    pub predicted_ids: Vec<i64>,
    pub confidence_summary: ConfidenceSummary,
}

impl From<TranscriptionResult> for TranscribeResponse {
    fn from(result: TranscriptionResult) -> Self {
        let mut confidence = result.confidence;
        confidence.average_confidence = round2(confidence.average_confidence);

        Self {
            transcription: result.transcription,
            predicted_ids: result.predicted_ids,
            confidence_summary: confidence,
        }
    }
}

/// Error body carrying a stage-labelled detail message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Round to two decimals for presentation; the core keeps full precision.
fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(average: f32) -> TranscriptionResult {
        TranscriptionResult {
            transcription: "hi".to_string(),
            predicted_ids: vec![3, 0, 3],
            confidence: ConfidenceSummary {
                average_confidence: average,
                low_confidence_tokens: 1,
                total_tokens: 3,
            },
        }
    }

    #[test]
    fn rounds_average_confidence_to_two_decimals() {
        let response = TranscribeResponse::from(result(-10.0 / 3.0));

        assert_eq!(response.confidence_summary.average_confidence, -3.33);
    }

    #[test]
    fn serializes_expected_field_names() {
        let value = serde_json::to_value(TranscribeResponse::from(result(-3.333))).unwrap();

        assert_eq!(value["transcription"], "hi");
        assert_eq!(value["predicted_ids"][0], 3);
        assert_eq!(value["confidence_summary"]["low_confidence_tokens"], 1);
        assert_eq!(value["confidence_summary"]["total_tokens"], 3);
    }
}

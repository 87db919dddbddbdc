//! Request handlers for the transcription endpoints.

use crate::response::{ErrorBody, TranscribeResponse};
use crate::server::AppState;
use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use vaani_asr::error::Error;

/// Multipart field carrying the uploaded audio file.
const FILE_FIELD: &str = "file";

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `POST /transcribe`: accept one `.wav` upload and return the
/// transcription with confidence diagnostics.
pub async fn transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>, (StatusCode, Json<ErrorBody>)> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some(FILE_FIELD) {
            let filename = field.file_name().unwrap_or_default().to_string();

            if !is_wav_filename(&filename) {
                return Err(bad_request("Only .wav files are supported.".to_string()));
            }

            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("failed to read upload: {e}")))?;

            upload = Some((filename, bytes));
            break;
        }
    }

    let Some((filename, bytes)) = upload else {
        return Err(bad_request(format!(
            "missing multipart field: {FILE_FIELD}"
        )));
    };

    tracing::info!(filename = %filename, bytes = bytes.len(), "transcription request");

    let transcriber = state.transcriber.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut transcriber = transcriber
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        transcriber.transcribe_wav_bytes(&bytes)
    })
    .await
    .map_err(|e| internal(format!("transcription task failed: {e}")))?;

    match result {
        Ok(result) => Ok(Json(TranscribeResponse::from(result))),
        Err(err) => Err(stage_error(&err)),
    }
}

/// Container check owned by the boundary; the core never sees non-wav
/// uploads.
pub fn is_wav_filename(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".wav")
}

/// Map a pipeline error to a status code and stage-labelled detail message.
pub fn stage_error(err: &Error) -> (StatusCode, Json<ErrorBody>) {
    let detail = match err {
        Error::Config(e) => format!("Model configuration error: {e}"),
        Error::Audio(e) => format!("Audio loading error: {e}"),
        Error::Feature(e) => format!("Spectrogram processing error: {e}"),
        Error::Model(e) => format!("ONNX inference failed: {e}"),
    };

    tracing::warn!(%detail, "transcription request failed");

    internal(detail)
}

fn bad_request(detail: String) -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { detail }))
}

fn internal(detail: String) -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { detail }))
}

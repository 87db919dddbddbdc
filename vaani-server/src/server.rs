//! HTTP server assembly: shared state, router, and startup.

use crate::cli::Args;
use crate::handlers;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use eyre::{Result, WrapErr};
#[allow(unused_imports)]
use ort::execution_providers::*;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use vaani_asr::transcriber::{Transcriber, TranscriberConfig};

/// Upload size cap; a minute of 16-bit 48kHz stereo is well under this.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Shared application state passed to Axum handlers.
///
/// The transcriber is immutable after startup; the mutex exists only
/// because `ort::Session::run` takes `&mut self`.
#[derive(Clone)]
pub struct AppState {
    pub transcriber: Arc<Mutex<Transcriber>>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/transcribe", post(handlers::transcribe))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
}

/// Load the model once and serve requests until shutdown.
pub async fn serve(args: Args) -> Result<()> {
    let transcriber = load_transcriber(&args)?;
    let state = AppState {
        transcriber: Arc::new(Mutex::new(transcriber)),
    };

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "listening");

    axum::serve(listener, build_router(state)).await?;

    Ok(())
}

fn load_transcriber(args: &Args) -> Result<Transcriber> {
    let config = TranscriberConfig {
        confidence_threshold: args.confidence_threshold,
        ..TranscriberConfig::default()
    };

    Transcriber::from_dir(&args.model_dir, build_session_builder()?, config)
        .wrap_err_with(|| format!("failed to load model from {:?}", args.model_dir.display()))
}

/// Configure the ONNX session with execution providers enabled by Cargo
/// features, in priority order. CPU is always available as fallback.
fn build_session_builder() -> Result<SessionBuilder> {
    let builder = Session::builder()?.with_execution_providers([
        #[cfg(feature = "cuda")]
        CUDAExecutionProvider::default().build(),
        #[cfg(feature = "tensorrt")]
        TensorRTExecutionProvider::default().build(),
        #[cfg(feature = "openvino")]
        OpenVINOExecutionProvider::default().build(),
        #[cfg(feature = "directml")]
        DirectMLExecutionProvider::default().build(),
        #[cfg(feature = "coreml")]
        CoreMLExecutionProvider::default().build(),
    ])?;

    Ok(builder)
}

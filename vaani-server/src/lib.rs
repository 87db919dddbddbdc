//! vaani-server: HTTP boundary for the vaani-asr transcription core.
//!
//! Owns everything the core treats as a collaborator concern: request
//! routing, upload handling, container validation, and response rendering.
//! The model and vocabulary are loaded once at startup and shared read-only
//! across requests.

pub mod cli;
pub mod handlers;
pub mod response;
pub mod server;

use cli::Args;
use eyre::Result;

/// Load the model and serve until shutdown.
pub fn run(args: Args) -> Result<()> {
    tracing::debug!(?args, "parsed arguments");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(server::serve(args))
}

//! SpeakUp · Spoken English Assessment Backend
//!
//! - Axum HTTP + WebSocket API
//! - Text analysis: vocabulary, phrasal verbs, creativity, long talk, fluency
//! - Optional speech-to-text via OpenAI (audio analysis)
//! - Practice question bank with configurable selection
//!
//! Important env variables:
//!   PORT                    : u16 (default 3000)
//!   OPENAI_API_KEY          : enables speech-to-text if present
//!   OPENAI_BASE_URL         : default "https://api.openai.com/v1"
//!   OPENAI_TRANSCRIBE_MODEL : default "whisper-1"
//!   ANALYZER_CONFIG_PATH    : path to TOML config (thresholds, lexicon, questions)
//!   LOG_LEVEL               : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT              : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod thresholds;
mod analyzer;
mod domain;
mod config;
mod seeds;
mod questions;
mod state;
mod protocol;
mod logic;
mod openai;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Thresholds, lexicon, question bank and the speech-to-text client.
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "speakup_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "speakup_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "speakup_backend", "Shutdown signal received");
}

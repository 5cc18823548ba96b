//! Quizgrade · Learner Assessment Backend
//!
//! - Axum HTTP API for question creation, answer validation, and display
//! - Optional external judge integration (via environment variables)
//! - Type catalogue with ~20 heterogeneous question types
//!
//! Important env variables:
//!   PORT                    : u16 (default 3000)
//!   OPENAI_API_KEY          : enables the external judge if present
//!   OPENAI_BASE_URL         : default "https://api.openai.com/v1"
//!   OPENAI_JUDGE_MODEL      : default "gpt-4o"
//!   OPENAI_TRANSCRIBE_MODEL : default "whisper-1"
//!   QUIZ_CONFIG_PATH        : path to TOML config (prompts + question bank)
//!   LOG_LEVEL               : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT              : "pretty" (default) or "json"

mod telemetry;
mod util;
mod errors;
mod catalog;
mod domain;
mod config;
mod seeds;
mod snapshot;
mod compare;
mod judge;
mod state;
mod protocol;
mod validate;
mod format;
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

  // Build shared application state (in-memory stores, judge client, prompts).
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quizgrade_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}

//! Wiring for the addrkit HTTP server: configuration and the traced router.

use std::path::PathBuf;

use addrkit_api::DEFAULT_MAX_BATCH_ROWS;
use addrkit_core::store::PatternRepository;
use addrkit_pipeline::{
  BatchCoordinator,
  config::{JusoConfig, LlmConfig, PipelineConfig},
  escalate::AiEscalator,
  geocode::Geocoder,
};
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `addrkit.toml` and
/// `ADDRKIT_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:           String,
  pub port:           u16,
  pub store_path:     PathBuf,
  pub max_batch_rows: usize,
  pub juso:           JusoConfig,
  pub llm:            LlmConfig,
  pub pipeline:       PipelineConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:           "127.0.0.1".to_owned(),
      port:           8080,
      store_path:     PathBuf::from("addrkit.sqlite3"),
      max_batch_rows: DEFAULT_MAX_BATCH_ROWS,
      juso:           JusoConfig::default(),
      llm:            LlmConfig::default(),
      pipeline:       PipelineConfig::default(),
    }
  }
}

impl ServerConfig {
  /// The LLM key to escalate with, if escalation is switched on and a
  /// non-blank key is configured.
  pub fn escalation_key(&self) -> Option<&str> {
    if !self.pipeline.ai_enabled {
      return None;
    }
    self.llm.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API router with request tracing.
pub fn router<R, G, A>(coordinator: BatchCoordinator<R, G, A>, config: &ServerConfig) -> Router
where
  R: PatternRepository + 'static,
  G: Geocoder + 'static,
  A: AiEscalator + 'static,
{
  addrkit_api::api_router(coordinator, config.max_batch_rows).layer(TraceLayer::new_for_http())
}

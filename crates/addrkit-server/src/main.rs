//! addrkit server binary.
//!
//! Reads `addrkit.toml` (or the path specified with `--config`), then
//! `ADDRKIT_*` environment variables, then the flags below. Opens the SQLite
//! learning store and serves the JSON API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use addrkit_pipeline::{
  BatchCoordinator,
  Pipeline,
  escalate::LlmEscalator,
  geocode::JusoClient,
};
use addrkit_server::ServerConfig;
use addrkit_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Korean shipping-address resolution server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "addrkit.toml")]
  config: PathBuf,

  /// Road-name address search API key.
  #[arg(long, env = "JUSO_API_KEY", hide_env_values = true)]
  juso_api_key: Option<String>,

  /// Chat-completions API key used for AI escalation.
  #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
  llm_api_key: Option<String>,

  /// Escalate unresolved details to the language model.
  #[arg(long, env = "AI_ENABLED")]
  ai_enabled: Option<bool>,

  /// Rule confidence below which a detail is escalated.
  #[arg(long, env = "AI_CONFIDENCE_THRESHOLD")]
  ai_confidence_threshold: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("ADDRKIT")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let mut cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if let Some(key) = cli.juso_api_key {
    cfg.juso.api_key = Some(key);
  }
  if let Some(key) = cli.llm_api_key {
    cfg.llm.api_key = Some(key);
  }
  if let Some(enabled) = cli.ai_enabled {
    cfg.pipeline.ai_enabled = enabled;
  }
  if let Some(threshold) = cli.ai_confidence_threshold {
    cfg.pipeline.ai_confidence_threshold = threshold;
  }

  // Open SQLite store.
  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Collaborators.
  let juso_key = cfg
    .juso
    .api_key
    .clone()
    .context("a road-name address API key is required (JUSO_API_KEY)")?;
  let geocoder = JusoClient::new(juso_key, &cfg.juso).context("failed to build geocoder client")?;

  let escalator = match cfg.escalation_key() {
    Some(key) => Some(LlmEscalator::new(key, &cfg.llm).context("failed to build llm client")?),
    None => {
      if cfg.pipeline.ai_enabled {
        tracing::warn!("AI escalation enabled but no LLM key configured; running rules only");
      }
      None
    }
  };
  tracing::info!(ai = escalator.is_some(), model = %cfg.llm.model, "pipeline ready");

  let pipeline = Pipeline::new(store, geocoder, escalator, cfg.pipeline.clone());
  let app = addrkit_server::router(BatchCoordinator::new(Arc::new(pipeline)), &cfg);
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

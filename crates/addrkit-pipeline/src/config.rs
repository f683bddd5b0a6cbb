//! Tunables for the pipeline and its collaborators.
//!
//! Every struct deserializes with defaults for missing keys, so a partial
//! `[pipeline]`, `[juso]` or `[llm]` table is enough.

use std::time::Duration;

use addrkit_core::resolution::MAX_FULL_ADDRESS_CHARS;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub ai_enabled:              bool,
  /// Rule confidence below which escalation is attempted.
  pub ai_confidence_threshold: f64,
  /// AI confidence at or above which an adopted suggestion is `valid`.
  pub ai_valid_confidence:     f64,
  pub batch_size:              usize,
  pub batch_pause_ms:          u64,
  pub max_full_address_chars:  usize,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      ai_enabled:              false,
      ai_confidence_threshold: 0.9,
      ai_valid_confidence:     0.85,
      batch_size:              5,
      batch_pause_ms:          100,
      max_full_address_chars:  MAX_FULL_ADDRESS_CHARS,
    }
  }
}

impl PipelineConfig {
  pub fn batch_pause(&self) -> Duration { Duration::from_millis(self.batch_pause_ms) }
}

/// The road-name address search service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct JusoConfig {
  pub api_key:      Option<String>,
  pub endpoint:     String,
  pub timeout_secs: u64,
}

impl Default for JusoConfig {
  fn default() -> Self {
    Self {
      api_key:      None,
      endpoint:     "https://business.juso.go.kr/addrlink/addrLinkApi.do".to_owned(),
      timeout_secs: 10,
    }
  }
}

/// An OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
  pub api_key:      Option<String>,
  pub endpoint:     String,
  pub model:        String,
  pub timeout_secs: u64,
}

impl Default for LlmConfig {
  fn default() -> Self {
    Self {
      api_key:      None,
      endpoint:     "https://api.openai.com/v1".to_owned(),
      model:        "gpt-4o-mini".to_owned(),
      timeout_secs: 30,
    }
  }
}

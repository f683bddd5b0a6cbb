//! AI escalation: the language-model collaborator for details the rules
//! could not settle.

use std::{future::Future, time::Duration};

use addrkit_core::building::BuildingType;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::LlmConfig, error::EscalationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationRequest {
  pub detail_address: String,
  pub building_type:  BuildingType,
  pub building_name:  Option<String>,
}

/// What the model proposes for a detail address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSuggestion {
  pub normalized:           String,
  pub confidence:           f64,
  #[serde(default)]
  pub reasoning:            String,
  #[serde(default)]
  pub has_error:            bool,
  #[serde(default)]
  pub suggested_correction: Option<String>,
}

pub trait AiEscalator: Send + Sync {
  fn escalate<'a>(
    &'a self,
    request: &'a EscalationRequest,
  ) -> impl Future<Output = Result<AiSuggestion, EscalationError>> + Send + 'a;
}

// ─── Reply parsing ───────────────────────────────────────────────────────────

/// The JSON object inside a model reply: a fenced ```` ```json ```` block if
/// there is one, else the span from the first `{` to the last `}`.
pub fn extract_json_block(reply: &str) -> Option<&str> {
  if let Some(start) = reply.find("```") {
    let after_fence = &reply[start + 3..];
    let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
    let body = &after_fence[body_start..];
    if let Some(end) = body.find("```") {
      let block = body[..end].trim();
      if block.starts_with('{') {
        return Some(block);
      }
    }
  }

  let open = reply.find('{')?;
  let close = reply.rfind('}')?;
  (close > open).then(|| &reply[open..=close])
}

/// Decode a model reply into a suggestion with confidence clamped to `[0, 1]`.
pub fn parse_suggestion(reply: &str) -> Result<AiSuggestion, EscalationError> {
  if reply.trim().is_empty() {
    return Err(EscalationError::EmptyReply);
  }
  let block = extract_json_block(reply)
    .ok_or_else(|| EscalationError::Parse("no JSON object in reply".to_owned()))?;
  let mut suggestion: AiSuggestion =
    serde_json::from_str(block).map_err(|e| EscalationError::Parse(e.to_string()))?;

  if !suggestion.confidence.is_finite() {
    return Err(EscalationError::Parse("confidence is not a number".to_owned()));
  }
  suggestion.confidence = suggestion.confidence.clamp(0.0, 1.0);
  suggestion.normalized = suggestion.normalized.trim().to_owned();
  Ok(suggestion)
}

// ─── Chat-completions client ─────────────────────────────────────────────────

const SYSTEM_PROMPT: &str = "당신은 한국 배송 주소의 상세주소(동/호/층)를 교정하는 도우미입니다. \
입력으로 상세주소, 건물 유형(apartment, quasi_apartment, general), 건물명이 주어집니다. \
배송 메모나 연락처는 상세주소에서 제외하고, 동/호/층 표기를 표준 형태(예: 101동 1001호, 지하 1층)로 정규화하세요. \
응답은 다음 JSON 객체 하나만 출력하세요: \
{\"normalized\": string, \"confidence\": number(0~1), \"reasoning\": string, \
\"hasError\": boolean, \"suggestedCorrection\": string|null}. \
상세주소를 판단할 수 없으면 hasError를 true로 설정하세요.";

#[derive(Serialize)]
struct ChatRequest<'a> {
  model:       &'a str,
  messages:    [ChatMessage<'a>; 2],
  temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
  role:    &'a str,
  content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
  message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
  #[serde(default)]
  content: Option<String>,
}

/// [`AiEscalator`] over an OpenAI-compatible `chat/completions` endpoint.
#[derive(Clone)]
pub struct LlmEscalator {
  client:   Client,
  api_key:  String,
  endpoint: String,
  model:    String,
}

impl LlmEscalator {
  pub fn new(api_key: impl Into<String>, config: &LlmConfig) -> Result<Self, EscalationError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self {
      client,
      api_key: api_key.into(),
      endpoint: config.endpoint.trim_end_matches('/').to_owned(),
      model: config.model.clone(),
    })
  }
}

impl AiEscalator for LlmEscalator {
  async fn escalate(&self, request: &EscalationRequest) -> Result<AiSuggestion, EscalationError> {
    let user = serde_json::to_string(request).map_err(|e| EscalationError::Parse(e.to_string()))?;
    let body = ChatRequest {
      model:       &self.model,
      messages:    [
        ChatMessage { role: "system", content: SYSTEM_PROMPT },
        ChatMessage { role: "user", content: &user },
      ],
      temperature: 0.0,
    };

    let resp = self
      .client
      .post(format!("{}/chat/completions", self.endpoint))
      .bearer_auth(&self.api_key)
      .json(&body)
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(EscalationError::Status(resp.status().as_u16()));
    }
    let chat: ChatResponse = resp.json().await?;
    let reply = chat
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .ok_or(EscalationError::EmptyReply)?;

    debug!(detail = %request.detail_address, "llm replied");
    parse_suggestion(&reply)
  }
}

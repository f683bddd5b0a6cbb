//! The geocoding collaborator and its road-name address (juso) client.

use std::{future::Future, time::Duration};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::JusoConfig, error::GeocodeError};

/// One candidate standard address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeCandidate {
  pub road_address:        String,
  pub jibun_address:       String,
  pub zip_code:            String,
  pub building_name:       Option<String>,
  pub building_class_code: Option<String>,
  pub sido:                String,
  pub sigungu:             String,
  pub eupmyeondong:        String,
  pub road_name:           String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResponse {
  pub total_count: u32,
  pub results:     Vec<GeocodeCandidate>,
}

/// Free-text query in, candidate standard addresses out.
///
/// An empty result set is `Ok`; only transport or service failures are `Err`.
pub trait Geocoder: Send + Sync {
  fn search<'a>(
    &'a self,
    query: &'a str,
  ) -> impl Future<Output = Result<GeocodeResponse, GeocodeError>> + Send + 'a;
}

// ─── Juso client ─────────────────────────────────────────────────────────────

const RESULTS_PER_PAGE: &str = "10";

/// Client for the public road-name address search API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct JusoClient {
  client:   Client,
  api_key:  String,
  endpoint: String,
}

impl JusoClient {
  pub fn new(api_key: impl Into<String>, config: &JusoConfig) -> Result<Self, GeocodeError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, api_key: api_key.into(), endpoint: config.endpoint.clone() })
  }
}

impl Geocoder for JusoClient {
  async fn search(&self, query: &str) -> Result<GeocodeResponse, GeocodeError> {
    let resp = self
      .client
      .get(&self.endpoint)
      .query(&[
        ("confmKey", self.api_key.as_str()),
        ("keyword", query),
        ("resultType", "json"),
        ("currentPage", "1"),
        ("countPerPage", RESULTS_PER_PAGE),
      ])
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(GeocodeError::Status(resp.status().as_u16()));
    }
    let body = resp.text().await?;
    let parsed = parse_response(&body)?;
    debug!(query, total = parsed.total_count, "geocoder answered");
    Ok(parsed)
  }
}

#[derive(Deserialize)]
struct Envelope {
  results: EnvelopeResults,
}

#[derive(Deserialize)]
struct EnvelopeResults {
  common: Common,
  #[serde(default)]
  juso:   Option<Vec<Juso>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Common {
  error_code:    String,
  #[serde(default)]
  error_message: String,
  #[serde(default)]
  total_count:   String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Juso {
  road_addr:  String,
  jibun_addr: String,
  zip_no:     String,
  bd_nm:      String,
  bd_kdcd:    String,
  si_nm:      String,
  sgg_nm:     String,
  emd_nm:     String,
  rn:         String,
}

fn non_empty(s: String) -> Option<String> {
  let trimmed = s.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

impl From<Juso> for GeocodeCandidate {
  fn from(j: Juso) -> Self {
    Self {
      road_address:        j.road_addr,
      jibun_address:       j.jibun_addr,
      zip_code:            j.zip_no,
      building_name:       non_empty(j.bd_nm),
      building_class_code: non_empty(j.bd_kdcd),
      sido:                j.si_nm,
      sigungu:             j.sgg_nm,
      eupmyeondong:        j.emd_nm,
      road_name:           j.rn,
    }
  }
}

/// Decode a juso JSON body. A non-zero `errorCode` is a service error.
pub fn parse_response(body: &str) -> Result<GeocodeResponse, GeocodeError> {
  let envelope: Envelope =
    serde_json::from_str(body).map_err(|e| GeocodeError::Decode(e.to_string()))?;
  let common = envelope.results.common;

  if common.error_code != "0" {
    return Err(GeocodeError::Service {
      code:    common.error_code,
      message: common.error_message,
    });
  }

  let total_count = match common.total_count.trim() {
    "" => 0,
    n => n
      .parse()
      .map_err(|_| GeocodeError::Decode(format!("bad totalCount {n:?}")))?,
  };
  let results = envelope
    .results
    .juso
    .unwrap_or_default()
    .into_iter()
    .map(GeocodeCandidate::from)
    .collect();

  Ok(GeocodeResponse { total_count, results })
}

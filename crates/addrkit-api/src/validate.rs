//! Handlers for row validation and service health.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/validate/batch` | Body: [`BatchBody`]; returns a [`BatchReport`] |
//! | `POST` | `/validate` | Body: one [`RowInput`]; returns its [`RowResolution`] |
//! | `GET`  | `/health` | Geocoder reachability and AI availability |

use addrkit_core::{
  resolution::{RowInput, RowResolution},
  store::PatternRepository,
};
use addrkit_pipeline::{
  BatchReport,
  escalate::AiEscalator,
  geocode::Geocoder,
  orchestrator::HealthReport,
};
use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use tracing::info;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct BatchBody {
  pub rows: Vec<RowInput>,
}

/// `POST /validate/batch`
///
/// The whole request is rejected up front when it is malformed or larger
/// than the configured row limit.
pub async fn batch<R, G, A>(
  State(state): State<ApiState<R, G, A>>,
  body: Result<Json<BatchBody>, JsonRejection>,
) -> Result<Json<BatchReport>, ApiError>
where
  R: PatternRepository + 'static,
  G: Geocoder + 'static,
  A: AiEscalator + 'static,
{
  let Json(body) = body?;
  if body.rows.len() > state.max_batch_rows {
    return Err(ApiError::BadRequest(format!(
      "batch of {} rows exceeds the limit of {}",
      body.rows.len(),
      state.max_batch_rows
    )));
  }

  info!(rows = body.rows.len(), "validating batch");
  Ok(Json(state.coordinator.run(body.rows).await))
}

/// `POST /validate`
pub async fn single<R, G, A>(
  State(state): State<ApiState<R, G, A>>,
  body: Result<Json<RowInput>, JsonRejection>,
) -> Result<Json<RowResolution>, ApiError>
where
  R: PatternRepository + 'static,
  G: Geocoder + 'static,
  A: AiEscalator + 'static,
{
  let Json(row) = body?;
  let report = state.coordinator.run(vec![row]).await;
  report
    .results
    .into_iter()
    .next()
    .map(Json)
    .ok_or_else(|| ApiError::BadRequest("no row to validate".to_owned()))
}

/// `GET /health`
pub async fn health<R, G, A>(State(state): State<ApiState<R, G, A>>) -> Json<HealthReport>
where
  R: PatternRepository + 'static,
  G: Geocoder + 'static,
  A: AiEscalator + 'static,
{
  Json(state.coordinator.pipeline().health().await)
}

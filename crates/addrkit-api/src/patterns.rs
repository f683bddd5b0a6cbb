//! Read-only views of the learning store.

use addrkit_core::{
  learning::LearningRecord,
  store::{LearningStats, PatternRepository, RecordQuery},
};
use addrkit_pipeline::{escalate::AiEscalator, geocode::Geocoder};
use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};

use crate::{ApiState, error::ApiError};

/// `GET /patterns[?buildingType=...][&limit=...][&offset=...]`
pub async fn list<R, G, A>(
  State(state): State<ApiState<R, G, A>>,
  query: Result<Query<RecordQuery>, QueryRejection>,
) -> Result<Json<Vec<LearningRecord>>, ApiError>
where
  R: PatternRepository + 'static,
  G: Geocoder + 'static,
  A: AiEscalator + 'static,
{
  let Query(query) = query?;
  let records = state.coordinator.pipeline().patterns().list(&query).await?;
  Ok(Json(records))
}

/// `GET /patterns/stats`
pub async fn stats<R, G, A>(
  State(state): State<ApiState<R, G, A>>,
) -> Result<Json<LearningStats>, ApiError>
where
  R: PatternRepository + 'static,
  G: Geocoder + 'static,
  A: AiEscalator + 'static,
{
  Ok(Json(state.coordinator.pipeline().patterns().stats().await?))
}

//! Operator feedback into the learning store.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/corrections` | Body: [`ManualCorrection`]; returns 201 + stored record |
//! | `POST` | `/corrections/confirm` | Body: [`ConfirmBody`]; 404 if nothing was learned for it |

use addrkit_core::{
  building::BuildingType,
  learning::LearningRecord,
  store::PatternRepository,
};
use addrkit_pipeline::{
  escalate::AiEscalator,
  geocode::Geocoder,
  patterns::ManualCorrection,
};
use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

/// `POST /corrections`
pub async fn create<R, G, A>(
  State(state): State<ApiState<R, G, A>>,
  body: Result<Json<ManualCorrection>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  R: PatternRepository + 'static,
  G: Geocoder + 'static,
  A: AiEscalator + 'static,
{
  let Json(correction) = body?;
  if correction.original_detail.trim().is_empty() || correction.corrected_detail.trim().is_empty()
  {
    return Err(ApiError::BadRequest(
      "originalDetail and correctedDetail must not be empty".to_owned(),
    ));
  }

  let record = state.coordinator.pipeline().patterns().save_manual(correction).await?;
  Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBody {
  pub original_detail: String,
  pub building_type:   BuildingType,
}

/// `POST /corrections/confirm`
pub async fn confirm<R, G, A>(
  State(state): State<ApiState<R, G, A>>,
  body: Result<Json<ConfirmBody>, JsonRejection>,
) -> Result<Json<LearningRecord>, ApiError>
where
  R: PatternRepository + 'static,
  G: Geocoder + 'static,
  A: AiEscalator + 'static,
{
  let Json(body) = body?;
  state
    .coordinator
    .pipeline()
    .patterns()
    .confirm(&body.original_detail, body.building_type)
    .await?
    .map(Json)
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "no learned correction for {:?} ({})",
        body.original_detail,
        body.building_type.as_str()
      ))
    })
}

//! Batch coordination: rows run in small concurrent groups with a pause
//! between groups to stay inside the geocoder's rate limit.

use std::sync::Arc;

use addrkit_core::{
  reason::ReasonCode,
  resolution::{BatchSummary, RowInput, RowResolution},
  store::PatternRepository,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{escalate::AiEscalator, geocode::Geocoder, orchestrator::Pipeline};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
  /// One entry per input row, in input order.
  pub results: Vec<RowResolution>,
  pub summary: BatchSummary,
}

/// Runs a [`Pipeline`] over many rows.
pub struct BatchCoordinator<R, G, A> {
  pipeline: Arc<Pipeline<R, G, A>>,
}

impl<R, G, A> Clone for BatchCoordinator<R, G, A> {
  fn clone(&self) -> Self { Self { pipeline: Arc::clone(&self.pipeline) } }
}

impl<R, G, A> BatchCoordinator<R, G, A>
where
  R: PatternRepository + 'static,
  G: Geocoder + 'static,
  A: AiEscalator + 'static,
{
  pub fn new(pipeline: Arc<Pipeline<R, G, A>>) -> Self { Self { pipeline } }

  pub fn pipeline(&self) -> &Pipeline<R, G, A> { &self.pipeline }

  /// Resolve every row. A row whose task dies becomes an `E_INTERNAL` row;
  /// the rest of the batch carries on.
  pub async fn run(&self, rows: Vec<RowInput>) -> BatchReport {
    let config = self.pipeline.config();
    let group_size = config.batch_size.max(1);
    let pause = config.batch_pause();

    let mut results = Vec::with_capacity(rows.len());
    for (i, group) in rows.chunks(group_size).enumerate() {
      if i > 0 {
        tokio::time::sleep(pause).await;
      }

      let handles: Vec<_> = group
        .iter()
        .cloned()
        .map(|row| {
          let pipeline = Arc::clone(&self.pipeline);
          tokio::spawn(async move { pipeline.resolve_row(&row).await })
        })
        .collect();

      for (row, handle) in group.iter().zip(handles) {
        match handle.await {
          Ok(resolution) => results.push(resolution),
          Err(e) => {
            error!(row = row.row_index, error = %e, "row task failed");
            results.push(RowResolution::fatal(
              row,
              ReasonCode::Internal,
              "행 처리 중 내부 오류가 발생했습니다",
            ));
          }
        }
      }
    }

    let summary = BatchSummary::tally(&results);
    info!(
      total = summary.total,
      valid = summary.valid_count,
      warning = summary.warning_count,
      invalid = summary.invalid_count,
      "batch resolved"
    );
    BatchReport { results, summary }
  }
}

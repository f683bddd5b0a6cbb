//! JSON REST API for addrkit.
//!
//! Exposes an axum [`Router`] over a [`BatchCoordinator`]. Auth, TLS, and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", addrkit_api::api_router(coordinator, 1000))
//! ```

pub mod corrections;
pub mod error;
pub mod patterns;
pub mod validate;

use addrkit_core::store::PatternRepository;
use addrkit_pipeline::{
  BatchCoordinator,
  escalate::AiEscalator,
  geocode::Geocoder,
};
use axum::{
  Router,
  routing::{get, post},
};

pub use error::ApiError;

/// Largest accepted `/validate/batch` request unless configured otherwise.
pub const DEFAULT_MAX_BATCH_ROWS: usize = 1000;

/// Shared state threaded through all handlers.
pub struct ApiState<R, G, A> {
  pub coordinator:    BatchCoordinator<R, G, A>,
  pub max_batch_rows: usize,
}

impl<R, G, A> Clone for ApiState<R, G, A> {
  fn clone(&self) -> Self {
    Self { coordinator: self.coordinator.clone(), max_batch_rows: self.max_batch_rows }
  }
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<R, G, A>(
  coordinator: BatchCoordinator<R, G, A>,
  max_batch_rows: usize,
) -> Router<()>
where
  R: PatternRepository + 'static,
  G: Geocoder + 'static,
  A: AiEscalator + 'static,
{
  Router::new()
    // Validation
    .route("/validate", post(validate::single::<R, G, A>))
    .route("/validate/batch", post(validate::batch::<R, G, A>))
    .route("/health", get(validate::health::<R, G, A>))
    // Learning store
    .route("/patterns", get(patterns::list::<R, G, A>))
    .route("/patterns/stats", get(patterns::stats::<R, G, A>))
    .route("/corrections", post(corrections::create::<R, G, A>))
    .route("/corrections/confirm", post(corrections::confirm::<R, G, A>))
    .with_state(ApiState { coordinator, max_batch_rows })
}

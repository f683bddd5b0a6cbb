//! Error types for `addrkit-pipeline`.
//!
//! Collaborator errors ([`GeocodeError`], [`EscalationError`]) never leave the
//! orchestrator; they become row verdicts or a silent fallback. [`Error`] is
//! only returned by the learning-store admin operations.

use thiserror::Error;

/// Failure talking to the geocoding service. "No results" is not an error.
#[derive(Debug, Error)]
pub enum GeocodeError {
  #[error("geocoder request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("geocoder returned HTTP {0}")]
  Status(u16),

  #[error("geocoder error {code}: {message}")]
  Service { code: String, message: String },

  #[error("malformed geocoder response: {0}")]
  Decode(String),
}

/// Failure obtaining a usable suggestion from the language model.
#[derive(Debug, Error)]
pub enum EscalationError {
  #[error("llm request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("llm returned HTTP {0}")]
  Status(u16),

  #[error("llm reply was empty")]
  EmptyReply,

  #[error("llm reply is not a suggestion: {0}")]
  Parse(String),
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("learning store error: {0}")]
  Repository(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn repository<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Repository(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error types for `addrkit-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown building type: {0:?}")]
  UnknownBuildingType(String),

  #[error("unknown reason code: {0:?}")]
  UnknownReasonCode(String),

  #[error("unknown correction type: {0:?}")]
  UnknownCorrectionType(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

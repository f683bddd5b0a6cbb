//! The addrkit resolution pipeline.
//!
//! Collaborator traits ([`geocode::Geocoder`], [`escalate::AiEscalator`])
//! with their HTTP clients, the learned-pattern tiers, the per-row
//! orchestrator and the batch coordinator. Storage comes in through
//! [`addrkit_core::store::PatternRepository`].

#![allow(async_fn_in_trait)]

pub mod batch;
pub mod config;
pub mod error;
pub mod escalate;
pub mod geocode;
pub mod orchestrator;
pub mod patterns;
pub mod resolver;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use batch::{BatchCoordinator, BatchReport};
pub use error::{Error, Result};
pub use orchestrator::Pipeline;

#[cfg(test)]
mod tests;

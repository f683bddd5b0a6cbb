//! Core types and pure logic for the addrkit address pipeline.
//!
//! This crate is free of HTTP and database dependencies. Text normalization,
//! classification, validation, detail rewrites and the learning-record math
//! live here; collaborators and storage plug in through traits.

// Native `async fn` in traits; the `Send` bounds are spelled out on the
// trait declarations themselves.
#![allow(async_fn_in_trait)]

pub mod building;
pub mod correction;
pub mod detail;
pub mod error;
pub mod extract;
pub mod learning;
pub mod memory;
pub mod phone;
pub mod reason;
pub mod resolution;
pub mod store;
pub mod text;
pub mod validate;

pub use error::{Error, Result};

//! REST API client module for F1 data.
//!
//! This module provides the `JolpicaClient` for fetching season schedules
//! and championship standings from the Jolpica F1 API, an Ergast-compatible
//! public service. No authentication is required.

pub mod client;
pub mod error;
mod responses;

pub use client::{JolpicaClient, DEFAULT_BASE_URL};
pub use error::ApiError;

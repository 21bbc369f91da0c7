//! Local cache of the dashboard payload.
//!
//! This module provides the `CacheStore` for the single JSON document the
//! dashboard is served from. The poller is its only writer; everything else
//! reads.

pub mod store;

pub use store::{CacheRecord, CacheStore, CACHE_FORMAT_VERSION};

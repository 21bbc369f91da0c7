//! Core library for paddock.
//!
//! Fetches the F1 calendar and championship standings from the Jolpica API,
//! keeps them in a single JSON cache file, and exposes the poller that keeps
//! that file fresh. The server binary and its views build on top of this.

pub mod api;
pub mod cache;
pub mod config;
pub mod fetcher;
pub mod fingerprint;
pub mod models;
pub mod poller;
pub mod spoiler;
pub mod utils;

pub use cache::{CacheRecord, CacheStore};
pub use config::Config;
pub use fetcher::{DataFetcher, EventIntent, F1DataSource};
pub use models::DashboardPayload;
pub use poller::{Poller, PollerSettings, RefreshOutcome, Trigger};

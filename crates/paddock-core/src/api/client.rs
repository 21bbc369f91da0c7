//! API client for the Jolpica F1 REST API.
//!
//! This module provides the `JolpicaClient` struct for fetching season
//! schedules and championship standings.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::responses::{Envelope, ScheduleData, StandingsData};
use super::ApiError;
use crate::fetcher::F1DataSource;
use crate::models::{Event, StandingEntry};

// ============================================================================
// Constants
// ============================================================================

/// Default base URL of the Ergast-compatible endpoints
pub const DEFAULT_BASE_URL: &str = "https://api.jolpi.ca/ergast/f1";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Page size for schedule requests. A season has fewer than 30 rounds.
const SCHEDULE_PAGE_LIMIT: u32 = 100;

/// Maximum number of retries for rate-limited (429) requests.
/// 3 retries with exponential backoff usually succeeds without excessive delay.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
/// 1 second is polite to the server while not making users wait too long.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for Jolpica.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct JolpicaClient {
    client: Client,
    base_url: String,
    initial_backoff: Duration,
}

impl JolpicaClient {
    /// Create a new API client against `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("paddock/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Override the first rate-limit backoff; later retries double it.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn schedule_url(&self, season: i32) -> String {
        format!("{}/{}.json?limit={}", self.base_url, season, SCHEDULE_PAGE_LIMIT)
    }

    fn driver_standings_url(&self, season: i32) -> String {
        format!("{}/{}/driverStandings.json", self.base_url, season)
    }

    fn constructor_standings_url(&self, season: i32) -> String {
        format!("{}/{}/constructorStandings.json", self.base_url, season)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(url: &str, response: reqwest::Response) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(url, status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = self
                .client
                .get(url)
                .header(header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send GET request to {}", url))?;

            match Self::check_response_for_retry(url, response).await? {
                Some(response) => {
                    return response
                        .json()
                        .await
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    // Rate limited
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited {
                            retries: MAX_RATE_LIMIT_RETRIES,
                        }
                        .into());
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    // ===== Data Fetching Methods =====

    /// Fetch every event of a season
    pub async fn fetch_schedule(&self, season: i32) -> Result<Vec<Event>> {
        let env: Envelope<ScheduleData> = self.get(&self.schedule_url(season)).await?;
        let races = env.mr_data.race_table.races;
        let total = races.len();

        let events: Vec<Event> = races.iter().filter_map(|r| r.to_event()).collect();
        if events.len() != total {
            warn!(season, skipped = total - events.len(), "Skipped malformed schedule entries");
        }
        debug!(season, count = events.len(), "Schedule fetched");
        Ok(events)
    }

    /// Fetch the drivers' championship table
    pub async fn fetch_driver_standings(&self, season: i32) -> Result<Vec<StandingEntry>> {
        let env: Envelope<StandingsData> = self.get(&self.driver_standings_url(season)).await?;
        Ok(env.mr_data.into_driver_entries())
    }

    /// Fetch the constructors' championship table
    pub async fn fetch_constructor_standings(&self, season: i32) -> Result<Vec<StandingEntry>> {
        let env: Envelope<StandingsData> = self.get(&self.constructor_standings_url(season)).await?;
        Ok(env.mr_data.into_constructor_entries())
    }
}

#[async_trait]
impl F1DataSource for JolpicaClient {
    async fn season_schedule(&self, season: i32) -> Result<Vec<Event>> {
        self.fetch_schedule(season).await
    }

    async fn driver_standings(&self, season: i32) -> Result<Vec<StandingEntry>> {
        self.fetch_driver_standings(season).await
    }

    async fn constructor_standings(&self, season: i32) -> Result<Vec<StandingEntry>> {
        self.fetch_constructor_standings(season).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    use axum::http::StatusCode;
    use axum::Router;

    use super::*;

    const EMPTY_SCHEDULE: &str = r#"{"MRData": {"RaceTable": {"season": "2025", "Races": []}}}"#;

    /// Local provider that answers with `statuses` in turn, then 200 with
    /// `body`. Returns its base URL and a request counter.
    async fn stub_provider(statuses: Vec<u16>, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().fallback(move || {
            let counter = Arc::clone(&counter);
            let statuses = statuses.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let code = statuses.get(n).copied().unwrap_or(200);
                (StatusCode::from_u16(code).unwrap(), body)
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/ergast/f1", addr), hits)
    }

    fn client(base_url: &str) -> JolpicaClient {
        JolpicaClient::new(base_url)
            .unwrap()
            .with_initial_backoff(Duration::from_millis(10))
    }

    #[test]
    fn test_urls() {
        let client = JolpicaClient::new("https://example.test/ergast/f1/").unwrap();
        assert_eq!(client.base_url(), "https://example.test/ergast/f1");
        assert_eq!(
            client.schedule_url(2025),
            "https://example.test/ergast/f1/2025.json?limit=100"
        );
        assert_eq!(
            client.driver_standings_url(2025),
            "https://example.test/ergast/f1/2025/driverStandings.json"
        );
        assert_eq!(
            client.constructor_standings_url(2024),
            "https://example.test/ergast/f1/2024/constructorStandings.json"
        );
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_an_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let client = JolpicaClient::new("http://127.0.0.1:9/ergast/f1").unwrap();
        assert!(client.fetch_schedule(2025).await.is_err());
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_until_success() {
        let (base, hits) = stub_provider(vec![429, 429], EMPTY_SCHEDULE).await;
        let started = Instant::now();

        let events = client(&base).fetch_schedule(2025).await.unwrap();
        assert!(events.is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        // 10ms then 20ms
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up_after_three_retries() {
        let (base, hits) = stub_provider(vec![429; 4], EMPTY_SCHEDULE).await;
        let started = Instant::now();

        let err = client(&base).fetch_schedule(2025).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::RateLimited { retries: 3 })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 4);
        // 10ms, 20ms, 40ms
        assert!(started.elapsed() >= Duration::from_millis(70));
    }

    #[tokio::test]
    async fn test_missing_season_is_not_published() {
        let (base, hits) = stub_provider(vec![404], "").await;
        let err = client(&base).fetch_schedule(2026).await.unwrap_err();
        assert!(err.downcast_ref::<ApiError>().is_some_and(ApiError::is_not_published));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}

//! Background poller: the single writer of the dashboard cache.
//!
//! The poller wakes on a fixed check interval and fetches fresh data when the
//! cached record is older than the poll interval. Manual refreshes (startup
//! flag, HTTP command) go through the same single-flight path, so at most one
//! fetch is ever in flight. Readers are served from an in-memory mirror of
//! the last record and never wait on the provider.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cache::{CacheRecord, CacheStore};
use crate::fetcher::DataFetcher;
use crate::models::DashboardPayload;

/// Source of the current time. Swapped out in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    pub interval: Duration,
    pub startup_delay: Duration,
    pub check_interval: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(12 * 3600),
            startup_delay: Duration::from_secs(30),
            check_interval: Duration::from_secs(300),
        }
    }
}

/// What asked for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// `--force-update` on the command line
    Startup,
    /// The polling loop found the cache due
    Scheduled,
    /// `POST /api/refresh`
    Manual,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Startup => write!(f, "startup"),
            Trigger::Scheduled => write!(f, "scheduled"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Completed {
        last_updated: DateTime<Utc>,
        fingerprint_changed: bool,
    },
    Failed {
        error: String,
    },
    AlreadyRunning,
    Cancelled,
}

/// Outcome bookkeeping for the status endpoint. Failures live only here;
/// they never touch the cache file.
#[derive(Debug, Clone, Default)]
struct PollHealth {
    last_poll_at: Option<DateTime<Utc>>,
    last_poll_ok: Option<bool>,
    last_error: Option<String>,
    consecutive_failures: u32,
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollStatus {
    pub has_cached_data: bool,
    /// Time of the poll that produced the cached data
    pub last_update: Option<DateTime<Utc>>,
    pub update_in_progress: bool,
    pub should_update: bool,
    pub cache_age_hours: Option<f64>,
    pub cache_age: Option<String>,
    pub next_poll_at: Option<DateTime<Utc>>,
    /// Most recent attempt, successful or not
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_poll_ok: Option<bool>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub poll_interval_hours: f64,
    pub cache_file: String,
    pub cache_size_bytes: Option<u64>,
}

pub struct Poller {
    fetcher: DataFetcher,
    store: CacheStore,
    settings: PollerSettings,
    current: RwLock<Option<CacheRecord>>,
    health: RwLock<PollHealth>,
    /// Set while a refresh task owns the cache writer role
    in_flight: AtomicBool,
    shutdown: CancellationToken,
    clock: Clock,
}

impl Poller {
    /// Create a poller, loading whatever the cache file holds. A missing or
    /// corrupt file means no data yet.
    pub fn new(
        fetcher: DataFetcher,
        store: CacheStore,
        settings: PollerSettings,
        shutdown: CancellationToken,
    ) -> Self {
        let current = store.load_or_empty();
        Self {
            fetcher,
            store,
            settings,
            current: RwLock::new(current),
            health: RwLock::new(PollHealth::default()),
            in_flight: AtomicBool::new(false),
            shutdown,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn interval(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.settings.interval).unwrap_or_else(|_| chrono::Duration::weeks(52))
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    // =========================================================================
    // Readers
    // =========================================================================

    /// The cached record, if any.
    pub async fn record(&self) -> Option<CacheRecord> {
        self.current.read().await.clone()
    }

    /// Payload to serve right now: the cached one with statuses re-derived,
    /// or the empty placeholder before the first successful poll.
    pub async fn payload(&self) -> DashboardPayload {
        let now = self.now();
        match self.current.read().await.as_ref() {
            Some(record) => record.payload.clone().at(now),
            None => DashboardPayload::placeholder(),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn should_update(&self) -> bool {
        let now = self.now();
        match self.current.read().await.as_ref() {
            Some(record) => record.is_stale(now, self.interval()),
            None => true,
        }
    }

    pub async fn status(&self) -> PollStatus {
        let now = self.now();
        let current = self.current.read().await;
        let health = self.health.read().await.clone();
        let record = current.as_ref();

        PollStatus {
            has_cached_data: record.is_some(),
            last_update: record.map(|r| r.last_poll_at),
            update_in_progress: self.is_refreshing(),
            should_update: record.map_or(true, |r| r.is_stale(now, self.interval())),
            cache_age_hours: record.map(|r| r.age_hours(now)),
            cache_age: record.map(|r| r.age_display(now)),
            next_poll_at: record.map(|r| r.next_poll_at),
            last_poll_at: health.last_poll_at,
            last_poll_ok: health.last_poll_ok,
            last_error: health.last_error,
            consecutive_failures: health.consecutive_failures,
            poll_interval_hours: self.settings.interval.as_secs_f64() / 3600.0,
            cache_file: self.store.path().display().to_string(),
            cache_size_bytes: self.store.size_on_disk(),
        }
    }

    // =========================================================================
    // Writer
    // =========================================================================

    /// Fetch and persist fresh data. A trigger arriving while another fetch
    /// is in flight is dropped and reported as `AlreadyRunning`.
    ///
    /// The work runs on its own task, so dropping the returned future (a
    /// disconnected HTTP client, say) does not abandon it halfway.
    pub async fn refresh(self: &Arc<Self>, trigger: Trigger) -> RefreshOutcome {
        let Some(flag) = InFlight::acquire(self) else {
            info!(%trigger, "Update already in progress, skipping");
            return RefreshOutcome::AlreadyRunning;
        };

        let task = tokio::spawn(async move {
            let outcome = flag.poller.refresh_now(trigger).await;
            drop(flag);
            outcome
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => self.record_failure(format!("Refresh task failed: {}", e)).await,
        }
    }

    async fn refresh_now(&self, trigger: Trigger) -> RefreshOutcome {
        let started = self.now();
        info!(%trigger, "Data update starting");

        let fetched = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                info!(%trigger, "Shutdown requested, abandoning data update");
                return RefreshOutcome::Cancelled;
            }
            result = self.fetcher.fetch_dashboard(started) => result,
        };

        let mut payload = match fetched {
            Ok(payload) => payload,
            Err(e) => return self.record_failure(format!("{:#}", e)).await,
        };

        let finished = self.now();
        payload.last_updated = Some(finished);
        payload.fetch_duration_secs = Some((finished - started).num_milliseconds() as f64 / 1000.0);
        let record = CacheRecord::new(payload, finished, self.interval());

        let store = self.store.clone();
        let to_save = record.clone();
        let saved = tokio::task::spawn_blocking(move || store.save(&to_save)).await;
        match saved {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return self.record_failure(format!("{:#}", e)).await,
            Err(e) => return self.record_failure(format!("Cache write task failed: {}", e)).await,
        }

        let fingerprint_changed = {
            let mut current = self.current.write().await;
            let changed = current
                .as_ref()
                .map_or(true, |old| old.payload.standings_fingerprint != record.payload.standings_fingerprint);
            *current = Some(record);
            changed
        };

        {
            let mut health = self.health.write().await;
            health.last_poll_at = Some(finished);
            health.last_poll_ok = Some(true);
            health.last_error = None;
            health.consecutive_failures = 0;
        }

        info!(
            %trigger,
            duration_secs = (finished - started).num_seconds(),
            fingerprint_changed,
            "Data update completed"
        );
        RefreshOutcome::Completed {
            last_updated: finished,
            fingerprint_changed,
        }
    }

    async fn record_failure(&self, error: String) -> RefreshOutcome {
        error!(error = %error, "Failed to update data, keeping previous cache");
        let mut health = self.health.write().await;
        health.last_poll_at = Some(self.now());
        health.last_poll_ok = Some(false);
        health.last_error = Some(error.clone());
        health.consecutive_failures += 1;
        RefreshOutcome::Failed { error }
    }

    // =========================================================================
    // Polling loop
    // =========================================================================

    /// How long to sleep before the next check.
    async fn until_next_check(&self) -> Duration {
        let check = self.settings.check_interval;
        let now = self.now();
        match self.current.read().await.as_ref() {
            Some(record) => {
                let due = record.last_poll_at + self.interval();
                match (due - now).to_std() {
                    Ok(remaining) if !remaining.is_zero() => remaining.min(check),
                    // Overdue: the last attempt failed, retry on the next check
                    _ => check,
                }
            }
            None => check,
        }
    }

    /// Sleep for `duration` unless shutdown comes first. Returns false on shutdown.
    async fn sleep_or_shutdown(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Run until the shutdown token is cancelled.
    pub async fn run(self: Arc<Self>) {
        info!(
            interval_hours = self.settings.interval.as_secs() / 3600,
            "Background polling started"
        );

        // Let the server start up first
        if self.sleep_or_shutdown(self.settings.startup_delay).await {
            loop {
                if self.should_update().await {
                    debug!("Cache is due for an update");
                    self.refresh(Trigger::Scheduled).await;
                }

                let wait = self.until_next_check().await;
                debug!(wait_secs = wait.as_secs(), "Next poll check scheduled");
                if !self.sleep_or_shutdown(wait).await {
                    break;
                }
            }
        }

        info!("Background polling stopped");
    }
}

/// Ownership of the single refresh slot. Releases it on drop, including
/// when the refresh task panics or is never polled.
struct InFlight {
    poller: Arc<Poller>,
}

impl InFlight {
    fn acquire(poller: &Arc<Poller>) -> Option<Self> {
        poller
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                poller: Arc::clone(poller),
            })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.poller.in_flight.store(false, Ordering::Release);
    }
}

// ============================================================================
// Tests
// ============================================================================

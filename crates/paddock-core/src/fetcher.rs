//! Data fetcher: turns provider schedules and standings into a dashboard payload.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::models::{DashboardPayload, Event, StandingEntry, Standings};

/// Upstream source of F1 data. Implemented by the HTTP client; tests
/// substitute an in-memory source.
#[async_trait]
pub trait F1DataSource: Send + Sync {
    /// All events of a season, in round order.
    async fn season_schedule(&self, season: i32) -> Result<Vec<Event>>;

    async fn driver_standings(&self, season: i32) -> Result<Vec<StandingEntry>>;

    async fn constructor_standings(&self, season: i32) -> Result<Vec<StandingEntry>>;
}

/// Which upcoming event a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventIntent {
    /// The first event with a session still to run (possibly under way).
    Current,
    /// The event after that one.
    Next,
}

impl EventIntent {
    fn position(&self) -> usize {
        match self {
            EventIntent::Current => 0,
            EventIntent::Next => 1,
        }
    }
}

/// Events still relevant at `now`, ordered by season and round.
pub fn upcoming(mut events: Vec<Event>, now: DateTime<Utc>) -> Vec<Event> {
    events.retain(|e| e.has_upcoming_session(now));
    events.sort_by_key(|e| (e.season, e.round));
    events
}

/// Pick the event for `intent` out of an upcoming list, with statuses for `now`.
pub fn select_event(upcoming: &[Event], intent: EventIntent, now: DateTime<Utc>) -> Option<Event> {
    upcoming.get(intent.position()).cloned().map(|mut event| {
        event.refresh_status(now);
        event
    })
}

pub struct DataFetcher {
    source: Arc<dyn F1DataSource>,
    /// Courtesy pause between provider calls
    request_spacing: Duration,
}

impl DataFetcher {
    pub fn new(source: Arc<dyn F1DataSource>, request_spacing: Duration) -> Self {
        Self {
            source,
            request_spacing,
        }
    }

    async fn pause(&self) {
        if !self.request_spacing.is_zero() {
            tokio::time::sleep(self.request_spacing).await;
        }
    }

    /// Upcoming events, rolling over into next season's schedule when the
    /// current one has fewer than two left.
    pub async fn upcoming_events(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let season = now.year();
        let schedule = self
            .source
            .season_schedule(season)
            .await
            .with_context(|| format!("Failed to fetch {} schedule", season))?;

        let mut events = upcoming(schedule, now);
        debug!(season, count = events.len(), "Upcoming events in current season");

        if events.len() <= EventIntent::Next.position() {
            self.pause().await;
            match self.source.season_schedule(season + 1).await {
                Ok(next_season) => events.extend(upcoming(next_season, now)),
                Err(e) if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_not_published) => {
                    info!(season = season + 1, "Next season schedule not published yet");
                }
                Err(e) => warn!(season = season + 1, error = %e, "Next season schedule unavailable"),
            }
        }

        Ok(events)
    }

    pub async fn fetch_event(&self, intent: EventIntent, now: DateTime<Utc>) -> Result<Option<Event>> {
        let events = self.upcoming_events(now).await?;
        Ok(select_event(&events, intent, now))
    }

    /// Top of both championships for the current season. Empty before the
    /// first race.
    pub async fn fetch_standings(&self, now: DateTime<Utc>) -> Result<Standings> {
        let season = now.year();
        let (drivers, constructors) = futures::try_join!(
            self.source.driver_standings(season),
            self.source.constructor_standings(season),
        )
        .with_context(|| format!("Failed to fetch {} standings", season))?;

        Ok(Standings::top(drivers, constructors))
    }

    /// Fetch everything the dashboard shows. Any provider failure fails the
    /// whole fetch so a partial payload is never cached.
    pub async fn fetch_dashboard(&self, now: DateTime<Utc>) -> Result<DashboardPayload> {
        info!("Fetching upcoming events");
        let events = self.upcoming_events(now).await?;

        self.pause().await;

        info!("Fetching current standings");
        let standings = self.fetch_standings(now).await?;

        Ok(DashboardPayload::new(
            select_event(&events, EventIntent::Current, now),
            select_event(&events, EventIntent::Next, now),
            standings,
            now,
        ))
    }
}

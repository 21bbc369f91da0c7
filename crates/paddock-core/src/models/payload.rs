use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Event, Standings};
use crate::fingerprint::standings_fingerprint;

/// Everything the dashboard shows, as served by `/api/data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardPayload {
    pub next_event: Option<Event>,
    pub event_after_next: Option<Event>,
    pub standings: Standings,
    /// When the data was fetched. None only for the placeholder served
    /// before the first successful poll.
    pub last_updated: Option<DateTime<Utc>>,
    pub standings_fingerprint: String,
    #[serde(default)]
    pub fetch_duration_secs: Option<f64>,
}

impl DashboardPayload {
    /// Build a payload, deriving the standings fingerprint.
    pub fn new(
        next_event: Option<Event>,
        event_after_next: Option<Event>,
        standings: Standings,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let standings_fingerprint = standings_fingerprint(&standings);
        Self {
            next_event,
            event_after_next,
            standings,
            last_updated: Some(fetched_at),
            standings_fingerprint,
            fetch_duration_secs: None,
        }
    }

    /// Payload shape served while no data has been cached yet.
    pub fn placeholder() -> Self {
        let standings = Standings::default();
        Self {
            next_event: None,
            event_after_next: None,
            standings_fingerprint: standings_fingerprint(&standings),
            standings,
            last_updated: None,
            fetch_duration_secs: None,
        }
    }

    /// Re-derive session statuses for serving at `now`. Pure; no provider I/O.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        if let Some(event) = self.next_event.as_mut() {
            event.refresh_status(now);
        }
        if let Some(event) = self.event_after_next.as_mut() {
            event.refresh_status(now);
        }
        self
    }

    /// True when the stored fingerprint matches the standings it describes.
    pub fn is_consistent(&self) -> bool {
        self.standings_fingerprint == standings_fingerprint(&self.standings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StandingEntry;
    use chrono::TimeZone;

    #[test]
    fn test_new_derives_fingerprint() {
        let standings = Standings {
            drivers: vec![StandingEntry {
                rank: 1,
                name: "Lando Norris".to_string(),
                points: 25.0,
                team: Some("McLaren".to_string()),
            }],
            constructors: vec![],
        };
        let now = Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();
        let payload = DashboardPayload::new(None, None, standings.clone(), now);
        assert_eq!(payload.standings_fingerprint, standings_fingerprint(&standings));
        assert_eq!(payload.last_updated, Some(now));
        assert!(payload.is_consistent());
    }

    #[test]
    fn test_placeholder_shape() {
        let payload = DashboardPayload::placeholder();
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["next_event"].is_null());
        assert!(json["event_after_next"].is_null());
        assert!(json["last_updated"].is_null());
        assert_eq!(json["standings"]["drivers"].as_array().map(Vec::len), Some(0));
        assert_eq!(
            json["standings_fingerprint"].as_str(),
            Some(standings_fingerprint(&Standings::default()).as_str())
        );
    }
}

//! Wire types for the Jolpica (Ergast-compatible) F1 API.
//!
//! Every payload is wrapped in an `MRData` envelope and numbers arrive as
//! strings. These types stay private to the client; conversions produce the
//! domain models in `crate::models`.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{Event, Session, SessionKind, SessionStatus, StandingEntry};

/// Time assumed when the provider publishes a date without a time.
const MIDNIGHT_UTC: &str = "00:00:00Z";

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(rename = "MRData")]
    pub mr_data: T,
}

// ===== Schedule =====

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleData {
    #[serde(rename = "RaceTable")]
    pub race_table: RaceTable,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RaceTable {
    #[serde(rename = "Races", default)]
    pub races: Vec<RaceResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionTime {
    pub date: String,
    pub time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RaceResponse {
    pub season: String,
    pub round: String,
    #[serde(rename = "raceName")]
    pub race_name: String,
    #[serde(rename = "Circuit")]
    pub circuit: CircuitResponse,
    pub date: String,
    pub time: Option<String>,
    #[serde(rename = "FirstPractice")]
    pub first_practice: Option<SessionTime>,
    #[serde(rename = "SecondPractice")]
    pub second_practice: Option<SessionTime>,
    #[serde(rename = "ThirdPractice")]
    pub third_practice: Option<SessionTime>,
    // 2023 called it the sprint shootout
    #[serde(rename = "SprintQualifying", alias = "SprintShootout")]
    pub sprint_qualifying: Option<SessionTime>,
    #[serde(rename = "Sprint")]
    pub sprint: Option<SessionTime>,
    #[serde(rename = "Qualifying")]
    pub qualifying: Option<SessionTime>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CircuitResponse {
    #[serde(rename = "circuitName")]
    pub circuit_name: String,
    #[serde(rename = "Location")]
    pub location: LocationResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationResponse {
    pub locality: String,
    pub country: String,
}

pub(crate) fn parse_utc(date: &str, time: Option<&str>) -> Option<DateTime<Utc>> {
    let stamp = format!("{}T{}", date, time.unwrap_or(MIDNIGHT_UTC));
    DateTime::parse_from_rfc3339(&stamp)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl RaceResponse {
    /// Convert to a domain event. Returns None when the race date or
    /// numbering is malformed. Statuses are left as scheduled; callers
    /// re-derive them for the current time.
    pub fn to_event(&self) -> Option<Event> {
        let season = self.season.parse().ok()?;
        let round = self.round.parse().ok()?;
        let start = parse_utc(&self.date, self.time.as_deref())?;

        let slots = [
            (SessionKind::Practice1, &self.first_practice),
            (SessionKind::Practice2, &self.second_practice),
            (SessionKind::Practice3, &self.third_practice),
            (SessionKind::SprintQualifying, &self.sprint_qualifying),
            (SessionKind::Sprint, &self.sprint),
            (SessionKind::Qualifying, &self.qualifying),
        ];

        let mut sessions: Vec<Session> = slots
            .iter()
            .filter_map(|(kind, slot)| {
                let slot = slot.as_ref()?;
                let start = parse_utc(&slot.date, slot.time.as_deref())?;
                Some(Session {
                    kind: *kind,
                    start,
                    status: SessionStatus::Scheduled,
                })
            })
            .collect();
        sessions.push(Session {
            kind: SessionKind::Race,
            start,
            status: SessionStatus::Scheduled,
        });
        sessions.sort_by_key(|s| s.start);

        Some(Event {
            season,
            round,
            name: self.race_name.clone(),
            circuit: self.circuit.circuit_name.clone(),
            location: format!(
                "{}, {}",
                self.circuit.location.locality, self.circuit.location.country
            ),
            start,
            sessions,
            next_session: None,
        })
    }
}

// ===== Standings =====

#[derive(Debug, Deserialize)]
pub(crate) struct StandingsData {
    #[serde(rename = "StandingsTable")]
    pub standings_table: StandingsTable,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StandingsTable {
    #[serde(rename = "StandingsLists", default)]
    pub lists: Vec<StandingsList>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StandingsList {
    #[serde(rename = "DriverStandings", default)]
    pub driver_standings: Vec<DriverStandingResponse>,
    #[serde(rename = "ConstructorStandings", default)]
    pub constructor_standings: Vec<ConstructorStandingResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriverStandingResponse {
    pub position: Option<String>,
    pub points: String,
    #[serde(rename = "Driver")]
    pub driver: DriverResponse,
    #[serde(rename = "Constructors", default)]
    pub constructors: Vec<ConstructorResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriverResponse {
    #[serde(rename = "givenName")]
    pub given_name: String,
    #[serde(rename = "familyName")]
    pub family_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConstructorStandingResponse {
    pub position: Option<String>,
    pub points: String,
    #[serde(rename = "Constructor")]
    pub constructor: ConstructorResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConstructorResponse {
    pub name: String,
}

impl DriverStandingResponse {
    /// Unclassified entries (no position) are dropped.
    pub fn to_entry(&self) -> Option<StandingEntry> {
        Some(StandingEntry {
            rank: self.position.as_deref()?.parse().ok()?,
            name: format!("{} {}", self.driver.given_name, self.driver.family_name),
            points: self.points.parse().ok()?,
            team: self.constructors.last().map(|c| c.name.clone()),
        })
    }
}

impl ConstructorStandingResponse {
    pub fn to_entry(&self) -> Option<StandingEntry> {
        Some(StandingEntry {
            rank: self.position.as_deref()?.parse().ok()?,
            name: self.constructor.name.clone(),
            points: self.points.parse().ok()?,
            team: None,
        })
    }
}

impl StandingsData {
    pub fn into_driver_entries(self) -> Vec<StandingEntry> {
        self.standings_table
            .lists
            .into_iter()
            .next()
            .map(|list| list.driver_standings.iter().filter_map(|d| d.to_entry()).collect())
            .unwrap_or_default()
    }

    pub fn into_constructor_entries(self) -> Vec<StandingEntry> {
        self.standings_table
            .lists
            .into_iter()
            .next()
            .map(|list| {
                list.constructor_standings
                    .iter()
                    .filter_map(|c| c.to_entry())
                    .collect()
            })
            .unwrap_or_default()
    }
}

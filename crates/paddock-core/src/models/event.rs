use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The kinds of session that make up a race weekend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Practice1,
    Practice2,
    Practice3,
    SprintQualifying,
    Sprint,
    Qualifying,
    Race,
}

impl SessionKind {
    /// Sessions worth headlining on the dashboard. Practice never is.
    pub fn is_headline(&self) -> bool {
        !matches!(
            self,
            SessionKind::Practice1 | SessionKind::Practice2 | SessionKind::Practice3
        )
    }

    /// Typical running time, used to decide when a session stops being live.
    pub fn nominal_duration(&self) -> Duration {
        match self {
            SessionKind::Practice1 | SessionKind::Practice2 | SessionKind::Practice3 => {
                Duration::minutes(60)
            }
            SessionKind::SprintQualifying => Duration::minutes(45),
            SessionKind::Sprint => Duration::minutes(60),
            SessionKind::Qualifying => Duration::minutes(60),
            SessionKind::Race => Duration::minutes(120),
        }
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::Practice1 => write!(f, "Practice 1"),
            SessionKind::Practice2 => write!(f, "Practice 2"),
            SessionKind::Practice3 => write!(f, "Practice 3"),
            SessionKind::SprintQualifying => write!(f, "Sprint Qualifying"),
            SessionKind::Sprint => write!(f, "Sprint"),
            SessionKind::Qualifying => write!(f, "Qualifying"),
            SessionKind::Race => write!(f, "Race"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Live,
    Completed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Scheduled => write!(f, "Scheduled"),
            SessionStatus::Live => write!(f, "Live"),
            SessionStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub kind: SessionKind,
    pub start: DateTime<Utc>,
    pub status: SessionStatus,
}

impl Session {
    pub fn new(kind: SessionKind, start: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            kind,
            start,
            status: Self::status_at(kind, start, now),
        }
    }

    pub fn status_at(kind: SessionKind, start: DateTime<Utc>, now: DateTime<Utc>) -> SessionStatus {
        if now < start {
            SessionStatus::Scheduled
        } else if now < start + kind.nominal_duration() {
            SessionStatus::Live
        } else {
            SessionStatus::Completed
        }
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.start > now
    }
}

/// A race weekend, normalized from the provider's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub season: i32,
    pub round: u32,
    pub name: String,
    pub circuit: String,
    /// "Locality, Country"
    pub location: String,
    /// Race start (UTC)
    pub start: DateTime<Utc>,
    /// All sessions, ordered by start time
    pub sessions: Vec<Session>,
    /// Next headline session still to run, if any
    #[serde(default)]
    pub next_session: Option<Session>,
}

impl Event {
    /// True while any session of the weekend has yet to start.
    pub fn has_upcoming_session(&self, now: DateTime<Utc>) -> bool {
        self.start > now || self.sessions.iter().any(|s| s.is_upcoming(now))
    }

    /// Earliest headline session (qualifying, sprint or race) that has not started.
    pub fn headline_session(&self, now: DateTime<Utc>) -> Option<&Session> {
        self.sessions
            .iter()
            .filter(|s| s.kind.is_headline() && s.is_upcoming(now))
            .min_by_key(|s| s.start)
    }

    /// Re-derive session statuses and the headline session for `now`.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) {
        for session in &mut self.sessions {
            session.status = Session::status_at(session.kind, session.start, now);
        }
        self.next_session = self.headline_session(now).cloned();
    }

    pub fn formatted_date(&self) -> String {
        self.start.format("%b %d, %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 6, h, m, 0).unwrap()
    }

    fn silverstone(now: DateTime<Utc>) -> Event {
        let day = |d: u32, h: u32| Utc.with_ymd_and_hms(2025, 7, d, h, 0, 0).unwrap();
        let sessions = vec![
            Session::new(SessionKind::Practice1, day(4, 11), now),
            Session::new(SessionKind::Practice2, day(4, 15), now),
            Session::new(SessionKind::Practice3, day(5, 10), now),
            Session::new(SessionKind::Qualifying, day(5, 14), now),
            Session::new(SessionKind::Race, day(6, 14), now),
        ];
        let mut event = Event {
            season: 2025,
            round: 12,
            name: "British Grand Prix".to_string(),
            circuit: "Silverstone Circuit".to_string(),
            location: "Silverstone, UK".to_string(),
            start: day(6, 14),
            sessions,
            next_session: None,
        };
        event.refresh_status(now);
        event
    }

    #[test]
    fn test_session_status_transitions() {
        let start = at(14, 0);
        assert_eq!(Session::status_at(SessionKind::Race, start, at(13, 59)), SessionStatus::Scheduled);
        assert_eq!(Session::status_at(SessionKind::Race, start, at(14, 0)), SessionStatus::Live);
        assert_eq!(Session::status_at(SessionKind::Race, start, at(15, 59)), SessionStatus::Live);
        assert_eq!(Session::status_at(SessionKind::Race, start, at(16, 0)), SessionStatus::Completed);
    }

    #[test]
    fn test_headline_skips_practice() {
        let friday_morning = Utc.with_ymd_and_hms(2025, 7, 4, 9, 0, 0).unwrap();
        let event = silverstone(friday_morning);
        let headline = event.next_session.expect("qualifying should be next");
        assert_eq!(headline.kind, SessionKind::Qualifying);
    }

    #[test]
    fn test_refresh_status_moves_headline_to_race() {
        let mut event = silverstone(Utc.with_ymd_and_hms(2025, 7, 4, 9, 0, 0).unwrap());
        event.refresh_status(at(9, 0));
        assert_eq!(event.next_session.as_ref().map(|s| s.kind), Some(SessionKind::Race));
        assert_eq!(event.sessions[3].status, SessionStatus::Completed);
        assert!(event.has_upcoming_session(at(9, 0)));

        event.refresh_status(at(15, 0));
        assert!(event.next_session.is_none());
        assert_eq!(event.sessions[4].status, SessionStatus::Live);
        assert!(!event.has_upcoming_session(at(15, 0)));
    }

    #[test]
    fn test_session_kind_display() {
        assert_eq!(SessionKind::SprintQualifying.to_string(), "Sprint Qualifying");
        assert_eq!(SessionKind::Practice2.to_string(), "Practice 2");
        assert!(!SessionKind::Practice3.is_headline());
        assert!(SessionKind::Sprint.is_headline());
    }

    #[test]
    fn test_formatted_date() {
        let event = silverstone(at(9, 0));
        assert_eq!(event.formatted_date(), "Jul 06, 2025");
    }
}

//! Data models for the dashboard.
//!
//! - `Event`, `Session`: race weekends and their sessions
//! - `StandingEntry`, `Standings`: top of the drivers' and constructors' championships
//! - `DashboardPayload`: the normalized document the web view renders

pub mod event;
pub mod payload;
pub mod standings;

pub use event::{Event, Session, SessionKind, SessionStatus};
pub use payload::DashboardPayload;
pub use standings::{StandingEntry, Standings, STANDINGS_DEPTH};

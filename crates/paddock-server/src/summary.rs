//! Console summary of the cached dashboard (`--mode summary`).

use std::fmt::Write;

use paddock_core::models::{DashboardPayload, Event, StandingEntry};
use paddock_core::poller::PollStatus;
use paddock_core::utils::format_size;

fn event_block(out: &mut String, heading: &str, event: Option<&Event>) {
    let _ = writeln!(out, "{}:", heading);
    match event {
        Some(event) => {
            let _ = writeln!(out, "  {} (Round {})", event.name, event.round);
            let _ = writeln!(out, "  {} - {}", event.circuit, event.location);
            let _ = writeln!(out, "  {}", event.formatted_date());
            if let Some(ref next) = event.next_session {
                let _ = writeln!(out, "  Next: {} at {}", next.kind, next.start.format("%a %b %d %H:%M UTC"));
            }
        }
        None => {
            let _ = writeln!(out, "  none scheduled");
        }
    }
}

fn standings_block(out: &mut String, heading: &str, entries: &[StandingEntry]) {
    let _ = writeln!(out, "{}:", heading);
    if entries.is_empty() {
        let _ = writeln!(out, "  no standings yet");
    }
    for entry in entries {
        match entry.team {
            Some(ref team) => {
                let _ = writeln!(out, "  {}. {} ({}) - {} pts", entry.rank, entry.name, team, entry.points_display());
            }
            None => {
                let _ = writeln!(out, "  {}. {} - {} pts", entry.rank, entry.name, entry.points_display());
            }
        }
    }
}

pub fn render(payload: &DashboardPayload, status: &PollStatus) -> String {
    let mut out = String::new();

    match status.cache_size_bytes {
        Some(bytes) => {
            let _ = writeln!(out, "Cache: {} ({})", status.cache_file, format_size(bytes));
        }
        None => {
            let _ = writeln!(out, "Cache: {} (missing)", status.cache_file);
        }
    }
    match (status.last_update, status.cache_age.as_deref()) {
        (Some(at), Some(age)) => {
            let _ = writeln!(out, "Last update: {} ({})", at.format("%Y-%m-%d %H:%M UTC"), age);
        }
        _ => {
            let _ = writeln!(out, "Last update: never");
        }
    }
    if let Some(secs) = payload.fetch_duration_secs {
        let _ = writeln!(out, "Fetch took {:.1}s", secs);
    }
    if let Some(ref error) = status.last_error {
        let _ = writeln!(out, "Last poll failed: {}", error);
    }
    let _ = writeln!(out, "Update due: {}", if status.should_update { "yes" } else { "no" });
    out.push('\n');

    event_block(&mut out, "Next race", payload.next_event.as_ref());
    event_block(&mut out, "After that", payload.event_after_next.as_ref());
    out.push('\n');

    standings_block(&mut out, "Drivers", &payload.standings.drivers);
    standings_block(&mut out, "Constructors", &payload.standings.constructors);
    let _ = writeln!(out, "Fingerprint: {}", payload.standings_fingerprint);

    out
}

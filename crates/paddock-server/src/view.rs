//! HTML rendering of the dashboard page.
//!
//! Times are written in UTC with the RFC 3339 instant in a `data-utc`
//! attribute; the page script rewrites them in the viewer's timezone.

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};

use paddock_core::models::{DashboardPayload, Event, SessionStatus, StandingEntry};
use paddock_core::spoiler::{RevealState, REVEAL_COOKIE};

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn utc_time(at: DateTime<Utc>, format: &str) -> String {
    format!(
        r#"<time data-utc="{}" data-format="{}">{}</time>"#,
        at.to_rfc3339_opts(SecondsFormat::Secs, true),
        format,
        at.format(if format == "date" { "%a %b %d" } else { "%a %b %d %H:%M UTC" })
    )
}

fn status_class(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Scheduled => "scheduled",
        SessionStatus::Live => "live",
        SessionStatus::Completed => "completed",
    }
}

fn render_event(out: &mut String, heading: &str, event: Option<&Event>) {
    let _ = write!(out, r#"<section class="event"><h2>{}</h2>"#, escape_html(heading));

    let Some(event) = event else {
        out.push_str(r#"<p class="empty">No event scheduled</p></section>"#);
        return;
    };

    let _ = write!(
        out,
        r#"<h3>{}</h3><p class="meta">Round {} &middot; {} &middot; {}</p><p class="date">{}</p>"#,
        escape_html(&event.name),
        event.round,
        escape_html(&event.circuit),
        escape_html(&event.location),
        utc_time(event.start, "date"),
    );

    if let Some(ref next) = event.next_session {
        let _ = write!(
            out,
            r#"<p class="next-session">Next: <strong>{}</strong> {}</p>"#,
            next.kind,
            utc_time(next.start, "datetime"),
        );
    }

    out.push_str(r#"<ul class="sessions">"#);
    for session in &event.sessions {
        let _ = write!(
            out,
            r#"<li class="{}"><span class="kind">{}</span> {}</li>"#,
            status_class(session.status),
            session.kind,
            utc_time(session.start, "datetime"),
        );
    }
    out.push_str("</ul></section>");
}

fn render_table(out: &mut String, title: &str, entries: &[StandingEntry]) {
    let _ = write!(out, r#"<div class="table"><h3>{}</h3>"#, escape_html(title));
    if entries.is_empty() {
        out.push_str(r#"<p class="empty">No standings yet</p></div>"#);
        return;
    }

    out.push_str("<ol>");
    for entry in entries {
        let _ = write!(
            out,
            r#"<li><span class="rank">{}</span><span class="name">{}</span>"#,
            entry.rank,
            escape_html(&entry.name),
        );
        if let Some(ref team) = entry.team {
            let _ = write!(out, r#"<span class="team">{}</span>"#, escape_html(team));
        }
        let _ = write!(out, r#"<span class="points">{} pts</span></li>"#, entry.points_display());
    }
    out.push_str("</ol></div>");
}

/// Embed the payload for the page script. `</` is escaped so the JSON
/// cannot close the script element.
fn embedded_json(payload: &DashboardPayload) -> String {
    serde_json::to_string(payload)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

pub fn render_page(payload: &DashboardPayload, reveal: &RevealState) -> String {
    let fingerprint = &payload.standings_fingerprint;
    let blurred = reveal.should_blur(fingerprint);

    let mut body = String::new();
    body.push_str(r#"<main class="events">"#);
    render_event(&mut body, "Next race", payload.next_event.as_ref());
    render_event(&mut body, "After that", payload.event_after_next.as_ref());
    body.push_str("</main>");

    let _ = write!(
        body,
        r#"<section id="standings" class="{}" data-fingerprint="{}"><h2>Standings</h2><p class="hint">Tap to {}</p><div class="tables">"#,
        if blurred { "standings blurred" } else { "standings" },
        escape_html(fingerprint),
        if blurred { "reveal" } else { "hide" },
    );
    render_table(&mut body, "Drivers", &payload.standings.drivers);
    render_table(&mut body, "Constructors", &payload.standings.constructors);
    body.push_str("</div></section>");

    body.push_str(r#"<footer>"#);
    match payload.last_updated {
        Some(at) => {
            let _ = write!(body, "Updated {}", utc_time(at, "datetime"));
        }
        None => body.push_str("Waiting for the first update"),
    }
    body.push_str("</footer>");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Paddock</title>
<link rel="stylesheet" href="/static/dashboard.css">
</head>
<body data-cookie="{cookie}">
{body}
<script id="dashboard-data" type="application/json">{json}</script>
<script src="/static/dashboard.js"></script>
</body>
</html>
"#,
        cookie = REVEAL_COOKIE,
        body = body,
        json = embedded_json(payload),
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use paddock_core::models::{Session, SessionKind, Standings};

    use super::*;

    fn payload() -> DashboardPayload {
        let race = Utc.with_ymd_and_hms(2025, 7, 6, 14, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap();
        let mut event = Event {
            season: 2025,
            round: 12,
            name: "British Grand Prix".to_string(),
            circuit: "Silverstone Circuit".to_string(),
            location: "Silverstone, UK".to_string(),
            start: race,
            sessions: vec![Session::new(SessionKind::Race, race, now)],
            next_session: None,
        };
        event.refresh_status(now);

        let standings = Standings {
            drivers: vec![StandingEntry {
                rank: 1,
                name: "Oscar Piastri".to_string(),
                points: 99.0,
                team: Some("McLaren".to_string()),
            }],
            constructors: vec![],
        };
        DashboardPayload::new(Some(event), None, standings, now)
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"A&B's"</b>"#),
            "&lt;b&gt;&quot;A&amp;B&#39;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_blurred_by_default() {
        let page = render_page(&payload(), &RevealState::default());
        assert!(page.contains(r#"class="standings blurred""#));
        assert!(page.contains("Tap to reveal"));
    }

    #[test]
    fn test_revealed_for_matching_fingerprint() {
        let payload = payload();
        let mut reveal = RevealState::default();
        reveal.reveal(&payload.standings_fingerprint);
        let page = render_page(&payload, &reveal);
        assert!(page.contains(r#"class="standings""#));
        assert!(page.contains("Tap to hide"));
    }

    #[test]
    fn test_times_carry_utc_instant() {
        let page = render_page(&payload(), &RevealState::default());
        assert!(page.contains(r#"data-utc="2025-07-06T14:00:00Z""#));
        assert!(page.contains("Next: <strong>Race</strong>"));
        assert!(page.contains(r#"<li class="scheduled">"#));
        assert!(page.contains("Round 12 &middot; Silverstone Circuit"));
    }

    #[test]
    fn test_placeholder_page() {
        let page = render_page(&DashboardPayload::placeholder(), &RevealState::default());
        assert!(page.contains("No event scheduled"));
        assert!(page.contains("No standings yet"));
        assert!(page.contains("Waiting for the first update"));
    }

    #[test]
    fn test_embedded_json_cannot_close_script() {
        let mut payload = payload();
        payload.standings.drivers[0].name = "</script><script>alert(1)".to_string();
        let page = render_page(&payload, &RevealState::default());
        assert!(!page.contains("</script><script>alert(1)"));
        assert!(page.contains("&lt;/script&gt;"));
        assert!(page.contains(r#"<\/script>"#));
    }
}

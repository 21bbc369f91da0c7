use chrono::Duration;

/// Human-readable age: "just now", "5m ago", "3h ago", "2d ago".
pub fn age_display(age: Duration) -> String {
    let minutes = age.num_minutes();
    if minutes < 1 {
        // Also covers clock skew (negative ages)
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        let remaining_mins = minutes % 60;
        if remaining_mins >= 30 {
            // Round up: 1h 30m+ becomes 2h
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        let remaining_hours = (minutes % 1440) / 60;
        if remaining_hours >= 12 {
            // Round up: 1d 12h+ becomes 2d
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

/// Age in hours rounded to one decimal place, as reported by `/api/status`.
pub fn hours_one_decimal(age: Duration) -> f64 {
    let hours = age.num_seconds() as f64 / 3600.0;
    (hours * 10.0).round() / 10.0
}

/// Format bytes as human readable
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} TB", size)
}

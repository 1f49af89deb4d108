//! Small helpers shared by the per-family parsers.

use std::time::{Duration, SystemTime};

/// Truncate to a character budget, appending an ellipsis marker when
/// anything was cut. Counts chars, not bytes, so multi-byte text never
/// splits mid-character.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let mut buf = String::new();
    for _ in 0..max_chars {
        if let Some(c) = chars.next() {
            buf.push(c);
        } else {
            return text.to_string();
        }
    }
    if chars.next().is_some() {
        buf.push_str("...");
    }
    buf
}

/// Extract the last path component for display ("Unknown" when the path has
/// no usable component).
pub(crate) fn project_name_from_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .unwrap_or("Unknown")
        .to_string()
}

/// Age of an RFC3339 timestamp, clamped at zero for clock skew.
pub(crate) fn rfc3339_age(timestamp: &str) -> Option<Duration> {
    let parsed = chrono::DateTime::parse_from_rfc3339(timestamp).ok()?;
    let secs = chrono::Utc::now()
        .signed_duration_since(parsed.with_timezone(&chrono::Utc))
        .num_seconds();
    Some(Duration::from_secs(secs.max(0) as u64))
}

pub(crate) fn system_time_to_rfc3339(time: SystemTime) -> String {
    time.duration_since(std::time::UNIX_EPOCH)
        .ok()
        .and_then(|d| chrono::DateTime::from_timestamp(d.as_secs() as i64, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339())
}

//! Human-readable durations used throughout `warden.yaml`.

use std::time::Duration;

/// Parse a duration string such as `"500ms"`, `"2s"`, `"1m"` or `"1h"`.
///
/// A bare number is taken as seconds. Returns `None` for anything else,
/// including negative or fractional values.
///
/// # Examples
///
/// ```
/// use service_warden::config::parse_duration_string;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration_string("2s"), Some(Duration::from_secs(2)));
/// assert_eq!(parse_duration_string("250ms"), Some(Duration::from_millis(250)));
/// assert_eq!(parse_duration_string("60"), Some(Duration::from_secs(60)));
/// assert_eq!(parse_duration_string("soon"), None);
/// ```
pub fn parse_duration_string(s: &str) -> Option<Duration> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    if number.is_empty() {
        return None;
    }
    let n = number.parse::<u64>().ok()?;

    match unit {
        "ms" => Some(Duration::from_millis(n)),
        "" | "s" => Some(Duration::from_secs(n)),
        "m" => n.checked_mul(60).map(Duration::from_secs),
        "h" => n.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}

/// Render a duration the way it would be written in config.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis % 1000 != 0 {
        return format!("{}ms", millis);
    }
    let secs = d.as_secs();
    if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

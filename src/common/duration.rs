//! Conversions between the archive's duration strings and seconds.
//!
//! Every parser here is lenient: malformed input yields zero instead of an
//! error, since a bad timestamp must never block playback.

use std::sync::OnceLock;

use regex::Regex;

const MISSING_BOX_ART: &str = "https://static-cdn.jtvnw.net/ttv-static/404_boxart.jpg";

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+(?:\.\d+)?)s)?$")
            .expect("timestamp pattern is valid")
    })
}

/// `HH:MM:SS` (or `MM:SS`, or `SS`) to seconds.
pub fn hms_to_seconds(hms: &str) -> u64 {
    let mut total: u64 = 0;
    let mut multiplier: u64 = 1;

    for part in hms.trim().rsplit(':') {
        let Ok(value) = part.trim().parse::<u64>() else {
            return 0;
        };
        total = total.saturating_add(value.saturating_mul(multiplier));
        multiplier = multiplier.saturating_mul(60);
    }

    total
}

/// Query-string timestamp (`1h2m3s`, `45m`, `90s`) to seconds.
pub fn parse_timestamp(timestamp: &str) -> f64 {
    let Some(caps) = timestamp_regex().captures(timestamp.trim()) else {
        return 0.0;
    };

    let hours: f64 = caps.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(0.0);
    let minutes: f64 = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0.0);
    let seconds: f64 = caps.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0.0);

    hours * 3600.0 + minutes * 60.0 + seconds
}

fn split_clock(secs: f64) -> (u64, u64, u64) {
    let whole = if secs.is_finite() && secs > 0.0 { secs as u64 } else { 0 };
    (whole / 3600, (whole / 60) % 60, whole % 60)
}

/// Seconds to the `1h2m3s` form used in share links.
pub fn to_hms(secs: f64) -> String {
    let (h, m, s) = split_clock(secs);
    format!("{h}h{m}m{s}s")
}

/// Seconds to a zero padded clock label, dropping an empty hour group.
pub fn to_hhmmss(secs: f64) -> String {
    let (h, m, s) = split_clock(secs);
    if h == 0 {
        format!("{m:02}:{s:02}")
    } else {
        format!("{h:02}:{m:02}:{s:02}")
    }
}

/// Resolves an artwork link, filling the `{width}x{height}` placeholder older
/// VODs carry.
pub fn image_url(link: Option<&str>, width: u32, height: u32) -> String {
    match link {
        Some(link) if !link.is_empty() => {
            link.replace("{width}x{height}", &format!("{width}x{height}"))
        }
        _ => MISSING_BOX_ART.to_string(),
    }
}

//! Form validation
//!
//! Each validator returns a human-readable message for invalid input and
//! `None` otherwise. Validators never fail.

use crate::codec::slugify;
use crate::models::{PeriodAvailability, PeriodView, Retention};

// ============================================================================
// Validation limits
// ============================================================================

/// Maximum stream name length
pub const STREAM_NAME_MAX: usize = 100;

/// Upper bound for reconnect and connection timeouts, in seconds
pub const TIMEOUT_MAX_SECONDS: u64 = 3_600;

/// Origin URL schemes the recorder can ingest
pub const ORIGIN_SCHEMES: &[&str] = &["srt", "rtmp", "rtmps", "udp", "http", "https"];

#[must_use]
pub fn validate_stream_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return Some("Name is required".to_string());
    }
    if name.chars().count() > STREAM_NAME_MAX {
        return Some(format!("Name must be at most {STREAM_NAME_MAX} characters"));
    }
    if slugify(name).is_empty() {
        return Some("Name must contain at least one letter or digit".to_string());
    }
    None
}

/// Retention is either a positive number of seconds or `"persistent"`
#[must_use]
pub fn validate_retention(value: &str) -> Option<String> {
    match Retention::parse(value) {
        Ok(Retention::Seconds(0)) => Some("Retention must be greater than 0".to_string()),
        Ok(_) => None,
        Err(e) => Some(e),
    }
}

/// An origin URL is optional; when present it must parse and use an ingest
/// scheme
#[must_use]
pub fn validate_origin_url(value: Option<&str>) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    match url::Url::parse(value) {
        Ok(url) if ORIGIN_SCHEMES.contains(&url.scheme()) => None,
        Ok(url) => Some(format!(
            "Unsupported URL scheme \"{}\" (expected one of: {})",
            url.scheme(),
            ORIGIN_SCHEMES.join(", ")
        )),
        Err(e) => Some(format!("Invalid URL: {e}")),
    }
}

#[must_use]
pub fn validate_reconnect_timeout(seconds: Option<u64>) -> Option<String> {
    match seconds {
        Some(s) if s > TIMEOUT_MAX_SECONDS => Some(format!(
            "Reconnect timeout must be at most {TIMEOUT_MAX_SECONDS} seconds"
        )),
        _ => None,
    }
}

/// Check a copy-to-VoD selection against the annotated periods
#[must_use]
pub fn validate_copy_selection(periods: &[PeriodView], selected: &[u32]) -> Option<String> {
    if selected.is_empty() {
        return Some("Select at least one recording period".to_string());
    }

    for id in selected {
        let Some(view) = periods.iter().find(|view| view.period.id == *id) else {
            return Some(format!("Recording period {id} does not exist"));
        };
        let reason = match view.availability {
            PeriodAvailability::Available => continue,
            PeriodAvailability::NoVideo => "has no recorded video",
            PeriodAvailability::TooShort => "is shorter than the minimum duration",
            PeriodAvailability::Expired => "is outside the retention window",
        };
        return Some(format!("Recording period {id} {reason}"));
    }

    None
}

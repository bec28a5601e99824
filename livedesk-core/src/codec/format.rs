//! Readable-unit formatters for bitrates and durations

/// Output style for [`duration_readable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationFormat {
    /// `"1h 5min"`
    #[default]
    Compact,
    /// `"01:05:00"`
    Colon,
}

/// Video bitrate in Mbps with one decimal, e.g. `"5.0Mbps"`
#[must_use]
pub fn video_bitrate_readable(bits_per_sec: Option<u64>) -> String {
    match bits_per_sec {
        Some(bps) if bps > 0 => format!("{:.1}Mbps", bps as f64 / 1_000_000.0),
        _ => String::new(),
    }
}

/// Audio bitrate in whole Kbps, e.g. `"128 Kbps"`
#[must_use]
pub fn audio_bitrate_readable(bits_per_sec: Option<u64>) -> String {
    match bits_per_sec {
        Some(bps) if bps > 0 => format!("{} Kbps", (bps as f64 / 1_000.0).round() as u64),
        _ => String::new(),
    }
}

#[must_use]
pub fn duration_readable(millis: Option<u64>, format: DurationFormat) -> String {
    let Some(millis) = millis.filter(|ms| *ms > 0) else {
        return String::new();
    };

    let total_secs = millis / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    match format {
        DurationFormat::Compact => format!("{hours}h {minutes}min"),
        DurationFormat::Colon => format!("{hours:02}:{minutes:02}:{seconds:02}"),
    }
}

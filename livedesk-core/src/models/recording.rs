use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::id::{LibraryId, ObjectId};
use super::stream::Retention;

/// Minimum closed-period duration eligible for archival
pub const MIN_COPY_DURATION_MS: i64 = 61_000;

/// One recorded source track inside a period
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTrack {
    /// Number of finalized parts recorded for this track
    pub parts: u64,
}

/// A contiguous recording range of a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingPeriod {
    /// Index in the stream's recording sequence
    pub id: u32,
    /// Epoch seconds
    pub start_time: i64,
    /// Epoch seconds, `None` while still recording
    pub end_time: Option<i64>,
    pub sources: BTreeMap<String, SourceTrack>,
}

/// Why a period can or cannot be archived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodAvailability {
    Available,
    NoVideo,
    TooShort,
    Expired,
}

impl PeriodAvailability {
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl RecordingPeriod {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end_time.is_none_or(|end| end == 0)
    }

    #[must_use]
    pub fn has_video(&self) -> bool {
        self.sources.get("video").is_some_and(|track| track.parts > 0)
    }

    /// Duration in milliseconds, `None` while open
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        match self.end_time {
            Some(end) if end != 0 && self.start_time != 0 => Some((end - self.start_time) * 1000),
            _ => None,
        }
    }

    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        epoch_to_utc(self.start_time)
    }

    /// End of the period, falling back to `now` while it is still open
    #[must_use]
    pub fn end_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.end_time {
            Some(end) if end != 0 => epoch_to_utc(end),
            _ => now,
        }
    }

    /// Check whether this period may be copied to a VoD object.
    ///
    /// Missing video always disqualifies. Closed periods shorter than
    /// [`MIN_COPY_DURATION_MS`] are rejected. Unless retention is persistent,
    /// a period whose start is older than the retention window has lost parts.
    #[must_use]
    pub fn availability(&self, retention: Retention, now: DateTime<Utc>) -> PeriodAvailability {
        if !self.has_video() {
            return PeriodAvailability::NoVideo;
        }

        if let Some(duration) = self.duration_ms() {
            if duration < MIN_COPY_DURATION_MS {
                return PeriodAvailability::TooShort;
            }
        }

        if let Retention::Seconds(ttl) = retention {
            let age = now.timestamp() - self.start_time;
            if age > i64::try_from(ttl).unwrap_or(i64::MAX) {
                return PeriodAvailability::Expired;
            }
        }

        PeriodAvailability::Available
    }

    /// Parse the `live_recording/recordings` subtree into periods.
    ///
    /// Entries that are not objects are skipped; a missing subtree yields no
    /// periods.
    #[must_use]
    pub fn list_from_metadata(recordings: &Value) -> Vec<Self> {
        let Some(offerings) = recordings.get("live_offering").and_then(Value::as_array) else {
            return Vec::new();
        };

        offerings
            .iter()
            .enumerate()
            .filter_map(|(index, period)| {
                let period = period.as_object()?;
                let start_time = period.get("start_time_epoch_sec")?.as_i64()?;
                let end_time = period
                    .get("end_time_epoch_sec")
                    .and_then(Value::as_i64)
                    .filter(|end| *end != 0);

                let sources = period
                    .get("sources")
                    .and_then(Value::as_object)
                    .map(|sources| {
                        sources
                            .iter()
                            .map(|(name, track)| {
                                let parts = track
                                    .get("parts")
                                    .and_then(Value::as_array)
                                    .map_or(0, |parts| parts.len() as u64);
                                (name.clone(), SourceTrack { parts })
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                Some(Self {
                    id: u32::try_from(index).ok()?,
                    start_time,
                    end_time,
                    sources,
                })
            })
            .collect()
    }
}

/// A period annotated with its archival availability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodView {
    pub period: RecordingPeriod,
    pub availability: PeriodAvailability,
}

/// Entry in a stream's `live_recording_copies` map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveRecordingCopy {
    #[serde(rename = "targetObjectId")]
    pub target_object_id: ObjectId,
    #[serde(rename = "targetLibraryId", default, skip_serializing_if = "Option::is_none")]
    pub target_library_id: Option<LibraryId>,
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "endTime")]
    pub end_time: DateTime<Utc>,
    pub create_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[must_use]
pub fn epoch_to_utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

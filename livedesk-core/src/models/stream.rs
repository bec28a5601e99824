use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::id::{LibraryId, ObjectId};
use super::playout::PlayoutConfig;

/// Stream lifecycle status as reported by the remote status oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Unconfigured,
    Uninitialized,
    Initialized,
    Inactive,
    Stopped,
    Starting,
    Running,
    Stalled,
    Degraded,
}

impl StreamStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Inactive => "inactive",
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stalled => "stalled",
            Self::Degraded => "degraded",
        }
    }

    /// A stream is active once an LRO has been launched and not yet deactivated
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Starting | Self::Running | Self::Stalled | Self::Stopped
        )
    }

    /// The LRO is live (start would be a no-op)
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Stalled)
    }

    /// Never configured or initialized; cannot be started
    #[must_use]
    pub const fn is_unready(&self) -> bool {
        matches!(self, Self::Unconfigured | Self::Uninitialized)
    }

    /// DVR and similar playout-only settings are editable only when idle
    #[must_use]
    pub const fn allows_offline_edits(&self) -> bool {
        matches!(self, Self::Inactive | Self::Stopped)
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StreamStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unconfigured" => Ok(Self::Unconfigured),
            "uninitialized" => Ok(Self::Uninitialized),
            "initialized" => Ok(Self::Initialized),
            "inactive" => Ok(Self::Inactive),
            "stopped" => Ok(Self::Stopped),
            "starting" => Ok(Self::Starting),
            "running" => Ok(Self::Running),
            "stalled" => Ok(Self::Stalled),
            "degraded" => Ok(Self::Degraded),
            other => Err(format!("unknown stream status: {other}")),
        }
    }
}

/// Ingest quality, independent of [`StreamStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamQuality {
    Good,
    Severe,
    Degraded,
}

/// Part retention for recorded media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Retention {
    Seconds(u64),
    Persistent,
}

impl Retention {
    /// Default retention when none is configured (one day)
    pub const DEFAULT_SECONDS: u64 = 86_400;

    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent)
    }

    #[must_use]
    pub const fn seconds(&self) -> Option<u64> {
        match self {
            Self::Seconds(s) => Some(*s),
            Self::Persistent => None,
        }
    }

    /// Parse a form value: `"persistent"` or a number of seconds
    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("persistent") {
            return Ok(Self::Persistent);
        }
        value
            .parse::<u64>()
            .map(Self::Seconds)
            .map_err(|_| format!("invalid retention: {value}"))
    }
}

impl Default for Retention {
    fn default() -> Self {
        Self::Seconds(Self::DEFAULT_SECONDS)
    }
}

/// Per-audio-track recording and playout settings, keyed by source stream index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrackConfig {
    #[serde(default)]
    pub record: bool,
    #[serde(default)]
    pub playout: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playout_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_channels: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_bitrate: Option<u64>,
}

/// Audio tracks keyed by source stream index
pub type AudioTracks = BTreeMap<u32, AudioTrackConfig>;

/// Recording side of a stream's configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingConfig {
    pub retention: Retention,
    pub connection_timeout: Option<u64>,
    pub reconnect_timeout: Option<u64>,
    pub audio: AudioTracks,
    pub ts_passthrough: bool,
    pub url: Option<String>,
}

/// Short-lived preview frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub url: String,
    pub captured_at: DateTime<Utc>,
}

/// Cached view of one live stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub slug: String,
    pub object_id: Option<ObjectId>,
    pub library_id: Option<LibraryId>,
    /// Position in the site listing
    pub order: Option<u32>,
    pub title: String,
    pub display_title: Option<String>,
    pub description: Option<String>,
    pub status: Option<StreamStatus>,
    pub quality: Option<StreamQuality>,
    pub warnings: Vec<String>,
    pub embed_url: Option<String>,
    pub frame: Option<FrameSnapshot>,
    pub recording: RecordingConfig,
    pub playout: PlayoutConfig,
}

impl Stream {
    #[must_use]
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_some_and(|s| s.is_active())
    }

    /// Merge a patch into this record. Fields absent from the patch are kept.
    pub fn apply(&mut self, patch: StreamPatch) {
        if let Some(v) = patch.object_id {
            self.object_id = Some(v);
        }
        if let Some(v) = patch.library_id {
            self.library_id = Some(v);
        }
        if let Some(v) = patch.order {
            self.order = Some(v);
        }
        if let Some(v) = patch.title {
            self.title = v;
        }
        if let Some(v) = patch.display_title {
            self.display_title = Some(v);
        }
        if let Some(v) = patch.description {
            self.description = Some(v);
        }
        if let Some(v) = patch.status {
            self.status = Some(v);
        }
        if let Some(v) = patch.quality {
            self.quality = Some(v);
        }
        if let Some(v) = patch.warnings {
            self.warnings = v;
        }
        if let Some(v) = patch.embed_url {
            self.embed_url = Some(v);
        }
        if let Some(v) = patch.frame {
            self.frame = Some(v);
        }
        if let Some(v) = patch.recording {
            self.recording = v;
        }
        if let Some(v) = patch.playout {
            self.playout = v;
        }
    }
}

/// Partial update for a cached [`Stream`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamPatch {
    pub object_id: Option<ObjectId>,
    pub library_id: Option<LibraryId>,
    pub order: Option<u32>,
    pub title: Option<String>,
    pub display_title: Option<String>,
    pub description: Option<String>,
    pub status: Option<StreamStatus>,
    pub quality: Option<StreamQuality>,
    pub warnings: Option<Vec<String>>,
    pub embed_url: Option<String>,
    pub frame: Option<FrameSnapshot>,
    pub recording: Option<RecordingConfig>,
    pub playout: Option<PlayoutConfig>,
}

impl StreamPatch {
    #[must_use]
    pub fn status(status: StreamStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

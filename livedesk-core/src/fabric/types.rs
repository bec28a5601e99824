// Request and response types exchanged with the fabric client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::FabricError;
use crate::models::{
    AudioTracks, LadderConfig, LibraryId, ObjectId, StreamQuality, StreamStatus, WriteToken,
};

/// Newly created content object with its open write token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedObject {
    pub object_id: ObjectId,
    pub write_token: WriteToken,
}

/// Result of committing a write token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedObject {
    /// Version hash of the committed object (e.g. `hq__...`)
    pub hash: String,
}

/// Object permission levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectPermission {
    Owner,
    Editable,
    Viewable,
    Listable,
    Public,
}

impl ObjectPermission {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Editable => "editable",
            Self::Viewable => "viewable",
            Self::Listable => "listable",
            Self::Public => "public",
        }
    }
}

impl std::str::FromStr for ObjectPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "editable" => Ok(Self::Editable),
            "viewable" => Ok(Self::Viewable),
            "listable" => Ok(Self::Listable),
            "public" => Ok(Self::Public),
            other => Err(format!("unknown permission: {other}")),
        }
    }
}

impl std::fmt::Display for ObjectPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of the stream status check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub state: StreamStatus,
    #[serde(default)]
    pub quality: Option<StreamQuality>,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Write token of the active edge recording session, if any
    #[serde(default)]
    pub edge_write_token: Option<String>,
    #[serde(default)]
    pub frame_url: Option<String>,
}

impl StatusResponse {
    #[must_use]
    pub fn has_edge_write_token(&self) -> bool {
        self.edge_write_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Long-running recording operation controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LroOperation {
    Start,
    Stop,
    Reset,
}

impl LroOperation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Reset => "reset",
        }
    }
}

/// Envelope returned by stream control calls.
///
/// Some calls report failure in-band through `error` while the transport
/// succeeds; [`ControlResponse::into_state`] turns that into an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlResponse {
    #[serde(default)]
    pub state: Option<StreamStatus>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl ControlResponse {
    pub fn into_state(self, method: &str) -> Result<Option<StreamStatus>, FabricError> {
        match self.error {
            Some(payload) if !payload.is_null() => Err(FabricError::remote(method, &payload)),
            _ => Ok(self.state),
        }
    }
}

/// Normalized settings written by the stream configuration primitive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamSettings {
    pub audio: AudioTracks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_ttl: Option<u64>,
    pub persistent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ladder: Option<LadderConfig>,
    pub copy_mpegts: bool,
}

/// Audio stream discovered by probing the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeAudioStream {
    pub stream_index: u32,
    #[serde(default)]
    pub channels: Option<u32>,
    #[serde(default)]
    pub bit_rate: Option<u64>,
    #[serde(default)]
    pub codec_name: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
}

/// Source layout discovered by the configuration primitive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    #[serde(default)]
    pub audio_streams: Vec<ProbeAudioStream>,
    #[serde(default)]
    pub video_stream_count: u32,
}

/// Options of the stream initialization primitive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitOptions {
    pub drm: Option<String>,
    pub formats: Vec<String>,
}

/// Link created under an object's metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSpec {
    /// Metadata path where the link is stored
    pub path: String,
    /// Link target, relative to the same object
    pub target: String,
    /// `"rep"` for representation links, `"meta"` for metadata links
    #[serde(rename = "type")]
    pub kind: String,
}

/// Copy a recorded range of a live stream into a VoD object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyToVodRequest {
    pub object_id: ObjectId,
    pub target_library_id: LibraryId,
    pub target_object_id: ObjectId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Specific period to copy; `None` copies the time range
    pub recording_period: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub id: LibraryId,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGroup {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_control_response_error_payload_is_failure() {
        let response: ControlResponse =
            serde_json::from_value(json!({"state": "stopped", "error": {"message": "no lro"}}))
                .unwrap();
        let err = response.into_state("StreamStopSession").unwrap_err();
        assert!(matches!(err, FabricError::Remote { ref message, .. } if message == "no lro"));
    }

    #[test]
    fn test_control_response_null_error_is_success() {
        let response: ControlResponse =
            serde_json::from_value(json!({"state": "running", "error": null})).unwrap();
        assert_eq!(response.into_state("x").unwrap(), Some(StreamStatus::Running));
    }

    #[test]
    fn test_edge_write_token_presence() {
        let mut status = StatusResponse {
            state: StreamStatus::Inactive,
            quality: None,
            warnings: vec![],
            edge_write_token: Some(String::new()),
            frame_url: None,
        };
        assert!(!status.has_edge_write_token());
        status.edge_write_token = Some("tqw__1".into());
        assert!(status.has_edge_write_token());
    }
}

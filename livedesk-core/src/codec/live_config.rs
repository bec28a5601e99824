//! Translation between stream form fields and the `live_recording_config`
//! metadata document stored on a stream object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{AudioTracks, PlayoutConfig, RecordingConfig, Retention};

/// Stream object metadata path of the encoded live config
pub const LIVE_CONFIG_PATH: &str = "live_recording_config";

/// Form-facing live stream settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveConfigFields {
    /// Encryption selection, e.g. `"clear"`, `"drm-public"`, `"drm-all"`
    pub encryption: String,
    pub playout_profile: Option<String>,
    pub retention: Retention,
    pub audio: AudioTracks,
    pub url: Option<String>,
    pub reconnect_timeout: Option<u64>,
    pub connection_timeout: Option<u64>,
    pub ts_passthrough: bool,
}

/// Wire-format live config document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drm: Option<String>,
    #[serde(default)]
    pub drm_type: String,
    #[serde(default)]
    pub audio: AudioTracks,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_ttl: Option<u64>,
    #[serde(default)]
    pub persistent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playout_ladder_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub copy_mpegts: bool,
}

/// Derive the coarse `drm` flag from the encryption selection.
///
/// Strings containing neither `"drm"` nor `"clear"` yield `None`; the
/// resulting document then carries no `drm` field at all.
#[must_use]
pub fn drm_from_encryption(encryption: &str) -> Option<String> {
    if encryption.contains("drm") {
        Some("drm".to_string())
    } else if encryption.contains("clear") {
        Some("clear".to_string())
    } else {
        None
    }
}

/// Encode form fields into the canonical metadata document.
///
/// Only tracks marked `record` are written.
#[must_use]
pub fn encode_live_config(fields: &LiveConfigFields) -> LiveConfig {
    let audio = fields
        .audio
        .iter()
        .filter(|(_, track)| track.record)
        .map(|(index, track)| (*index, track.clone()))
        .collect();

    LiveConfig {
        drm: drm_from_encryption(&fields.encryption),
        drm_type: fields.encryption.clone(),
        audio,
        part_ttl: fields.retention.seconds(),
        persistent: fields.retention.is_persistent(),
        url: fields.url.clone(),
        reference_url: fields.url.clone(),
        playout_ladder_profile: fields.playout_profile.clone(),
        reconnect_timeout: fields.reconnect_timeout,
        connection_timeout: fields.connection_timeout,
        copy_mpegts: fields.ts_passthrough,
    }
}

/// Decode a stored document back into form fields.
///
/// A missing or null document decodes as defaults. Anything else must parse.
pub fn decode_live_config(value: Option<&Value>) -> Result<LiveConfigFields, serde_json::Error> {
    let config: LiveConfig = match value {
        None | Some(Value::Null) => LiveConfig::default(),
        Some(value) => serde_json::from_value(value.clone())?,
    };
    Ok(config.into_fields())
}

/// Keys of the stored document owned by [`LiveConfig`]
const LIVE_CONFIG_KEYS: [&str; 11] = [
    "drm",
    "drm_type",
    "audio",
    "part_ttl",
    "persistent",
    "url",
    "reference_url",
    "playout_ladder_profile",
    "reconnect_timeout",
    "connection_timeout",
    "copy_mpegts",
];

/// Lay an encoded document over the stored one.
///
/// Every owned key is replaced, so fields cleared in `encoded` disappear.
/// Keys written by other tools are kept.
pub fn overlay_live_config(stored: Option<Value>, encoded: &LiveConfig) -> Result<Value, serde_json::Error> {
    let mut document = match stored {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    for key in LIVE_CONFIG_KEYS {
        document.remove(key);
    }
    if let Value::Object(fields) = serde_json::to_value(encoded)? {
        document.extend(fields);
    }
    Ok(Value::Object(document))
}

impl LiveConfig {
    #[must_use]
    pub fn retention(&self) -> Retention {
        if self.persistent {
            Retention::Persistent
        } else {
            self.part_ttl.map_or_else(Retention::default, Retention::Seconds)
        }
    }

    #[must_use]
    pub fn into_fields(self) -> LiveConfigFields {
        let retention = self.retention();
        LiveConfigFields {
            encryption: self.drm_type,
            playout_profile: self.playout_ladder_profile,
            retention,
            audio: self
                .audio
                .into_iter()
                .filter(|(_, track)| track.record)
                .collect(),
            url: self.url.or(self.reference_url),
            reconnect_timeout: self.reconnect_timeout,
            connection_timeout: self.connection_timeout,
            ts_passthrough: self.copy_mpegts,
        }
    }
}

impl LiveConfigFields {
    #[must_use]
    pub fn recording_config(&self) -> RecordingConfig {
        RecordingConfig {
            retention: self.retention,
            connection_timeout: self.connection_timeout,
            reconnect_timeout: self.reconnect_timeout,
            audio: self.audio.clone(),
            ts_passthrough: self.ts_passthrough,
            url: self.url.clone(),
        }
    }

    /// Playout fields known from the live config alone (no watermark/DVR)
    #[must_use]
    pub fn playout_config(&self) -> PlayoutConfig {
        PlayoutConfig {
            drm_type: (!self.encryption.is_empty()).then(|| self.encryption.clone()),
            ladder_profile: self.playout_profile.clone(),
            ..PlayoutConfig::default()
        }
    }
}

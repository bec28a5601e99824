use serde::{Deserialize, Serialize};

/// Video rendition in a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRendition {
    pub bit_rate: u64,
    #[serde(default)]
    pub codecs: String,
    pub height: u32,
    pub width: u32,
}

/// Audio rendition in a profile, matched to tracks by channel count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRendition {
    pub bit_rate: u64,
    pub channels: u32,
    #[serde(default)]
    pub codecs: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileLadder {
    #[serde(default)]
    pub video: Vec<VideoRendition>,
    #[serde(default)]
    pub audio: Vec<AudioRendition>,
}

/// A named encoding ladder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ladder_specs: ProfileLadder,
}

/// Site-level profile document (`public/asset_metadata/profiles`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDocument {
    #[serde(default)]
    pub default: LadderProfile,
    #[serde(default)]
    pub custom: Vec<LadderProfile>,
}

impl ProfileDocument {
    /// Name under which the default profile is selected
    pub const DEFAULT_NAME: &'static str = "default";

    /// Resolve a profile by name. `None` or `"default"` selects the default
    /// profile; anything else must match a custom profile's name.
    #[must_use]
    pub fn resolve(&self, name: Option<&str>) -> Option<&LadderProfile> {
        match name {
            None => Some(&self.default),
            Some(n) if n.is_empty() || n.eq_ignore_ascii_case(Self::DEFAULT_NAME) => {
                Some(&self.default)
            }
            Some(n) => self.custom.iter().find(|p| p.name == n),
        }
    }

    /// Check custom profile names are present and unique
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for profile in &self.custom {
            let name = profile.name.trim();
            if name.is_empty() {
                return Err("custom profile name cannot be empty".to_string());
            }
            if name.eq_ignore_ascii_case(Self::DEFAULT_NAME) {
                return Err(format!("custom profile cannot be named \"{name}\""));
            }
            if !seen.insert(name.to_string()) {
                return Err(format!("duplicate custom profile name: {name}"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MediaType {
    Video,
    Audio,
}

impl From<MediaType> for u8 {
    fn from(value: MediaType) -> Self {
        match value {
            MediaType::Video => 1,
            MediaType::Audio => 2,
        }
    }
}

impl TryFrom<u8> for MediaType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Video),
            2 => Ok(Self::Audio),
            other => Err(format!("unknown media type {other}")),
        }
    }
}

/// One output rendition written to `recording_params/ladder_specs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderSpec {
    pub media_type: MediaType,
    pub representation: String,
    pub bit_rate: u64,
    pub codecs: String,
    pub stream_index: u32,
    pub stream_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default)]
    pub default: bool,
}

/// Number of slots in the audio index table
pub const AUDIO_INDEX_SLOTS: usize = 8;

/// Full ladder section persisted alongside the aggregate fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderConfig {
    pub ladder_specs: Vec<LadderSpec>,
    pub audio_bitrate: u64,
    pub video_bitrate: u64,
    pub n_audio: u32,
    pub audio_index: [u32; AUDIO_INDEX_SLOTS],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> ProfileDocument {
        ProfileDocument {
            default: LadderProfile {
                name: "Default".into(),
                ladder_specs: ProfileLadder::default(),
            },
            custom: vec![LadderProfile {
                name: "hd".into(),
                ladder_specs: ProfileLadder::default(),
            }],
        }
    }

    #[test]
    fn test_resolve_profile() {
        let doc = doc();
        assert_eq!(doc.resolve(None).unwrap().name, "Default");
        assert_eq!(doc.resolve(Some("default")).unwrap().name, "Default");
        assert_eq!(doc.resolve(Some("hd")).unwrap().name, "hd");
        assert!(doc.resolve(Some("4k")).is_none());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut doc = doc();
        assert!(doc.validate().is_ok());
        doc.custom.push(LadderProfile {
            name: "hd".into(),
            ..LadderProfile::default()
        });
        assert!(doc.validate().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn test_media_type_wire_format() {
        assert_eq!(serde_json::to_value(MediaType::Audio).unwrap(), serde_json::json!(2));
        assert!(serde_json::from_value::<MediaType>(serde_json::json!(3)).is_err());
    }
}

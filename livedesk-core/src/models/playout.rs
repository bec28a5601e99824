use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Watermark kinds. At most one is active on a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkKind {
    Text,
    Image,
    Forensic,
}

impl WatermarkKind {
    pub const ALL: [Self; 3] = [Self::Text, Self::Image, Self::Forensic];

    /// Key of this kind inside `live_recording/playout_config`
    #[must_use]
    pub const fn metadata_key(&self) -> &'static str {
        match self {
            Self::Text => "simple_watermark",
            Self::Image => "image_watermark",
            Self::Forensic => "forensic_watermark",
        }
    }
}

/// Text overlay ("simple") watermark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextWatermark {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_relative_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Image overlay watermark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageWatermark {
    /// Fabric path or link to the image file
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align_h: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align_v: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_video_height: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Forensic (per-viewer) watermark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForensicWatermark {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algo: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Watermark {
    Text(TextWatermark),
    Image(ImageWatermark),
    Forensic(ForensicWatermark),
}

impl Watermark {
    #[must_use]
    pub const fn kind(&self) -> WatermarkKind {
        match self {
            Self::Text(_) => WatermarkKind::Text,
            Self::Image(_) => WatermarkKind::Image,
            Self::Forensic(_) => WatermarkKind::Forensic,
        }
    }

    /// Body stored under [`WatermarkKind::metadata_key`]
    pub fn body(&self) -> serde_json::Result<Value> {
        match self {
            Self::Text(w) => serde_json::to_value(w),
            Self::Image(w) => serde_json::to_value(w),
            Self::Forensic(w) => serde_json::to_value(w),
        }
    }

    /// Read the active watermark out of a `playout_config` subtree.
    ///
    /// When more than one kind is present (a state the console never
    /// produces), the first in [`WatermarkKind::ALL`] order wins.
    #[must_use]
    pub fn from_playout_metadata(playout: &Value) -> Option<Self> {
        for kind in active_watermark_kinds(playout) {
            let body = playout.get(kind.metadata_key())?.clone();
            let parsed = match kind {
                WatermarkKind::Text => serde_json::from_value(body).map(Self::Text),
                WatermarkKind::Image => serde_json::from_value(body).map(Self::Image),
                WatermarkKind::Forensic => serde_json::from_value(body).map(Self::Forensic),
            };
            if let Ok(watermark) = parsed {
                return Some(watermark);
            }
        }
        None
    }
}

/// Watermark kinds that currently carry a non-null body in `playout`
#[must_use]
pub fn active_watermark_kinds(playout: &Value) -> Vec<WatermarkKind> {
    WatermarkKind::ALL
        .into_iter()
        .filter(|kind| playout.get(kind.metadata_key()).is_some_and(|v| !v.is_null()))
        .collect()
}

/// DVR (rewind) window settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvrSettings {
    pub enabled: bool,
    pub start_time: Option<DateTime<Utc>>,
    /// Maximum rewind window in seconds
    pub max_duration: Option<u64>,
}

/// Playout side of a stream's configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayoutConfig {
    pub drm_type: Option<String>,
    pub ladder_profile: Option<String>,
    pub watermark: Option<Watermark>,
    pub dvr: DvrSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_active_kinds_ignores_null_bodies() {
        let playout = json!({
            "simple_watermark": null,
            "image_watermark": {"image": "./files/logo.png"},
        });
        assert_eq!(active_watermark_kinds(&playout), vec![WatermarkKind::Image]);
    }

    #[test]
    fn test_from_playout_metadata() {
        let playout = json!({
            "simple_watermark": {"text": "LIVE", "font_color": "white"},
        });
        let watermark = Watermark::from_playout_metadata(&playout).unwrap();
        assert_eq!(watermark.kind(), WatermarkKind::Text);
        match watermark {
            Watermark::Text(text) => assert_eq!(text.text, "LIVE"),
            other => panic!("unexpected watermark {other:?}"),
        }

        assert!(Watermark::from_playout_metadata(&json!({})).is_none());
    }
}

//! Pure translation functions between form fields, wire metadata and
//! human-readable text. Nothing in here touches the fabric.

pub mod format;
pub mod ladder;
pub mod live_config;
pub mod slug;

pub use format::{audio_bitrate_readable, duration_readable, video_bitrate_readable, DurationFormat};
pub use ladder::build_ladder_config;
pub use live_config::{
    decode_live_config, drm_from_encryption, encode_live_config, overlay_live_config, LiveConfig,
    LiveConfigFields, LIVE_CONFIG_PATH,
};
pub use slug::slugify;

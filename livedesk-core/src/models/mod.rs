pub mod id;
pub mod ladder;
pub mod playout;
pub mod recording;
pub mod site;
pub mod stream;

pub use id::{LibraryId, ObjectId, WriteToken};
pub use ladder::{
    AudioRendition, LadderConfig, LadderProfile, LadderSpec, MediaType, ProfileDocument,
    ProfileLadder, VideoRendition, AUDIO_INDEX_SLOTS,
};
pub use playout::{
    active_watermark_kinds, DvrSettings, ForensicWatermark, ImageWatermark, PlayoutConfig,
    TextWatermark, Watermark, WatermarkKind,
};
pub use recording::{
    epoch_to_utc, LiveRecordingCopy, PeriodAvailability, PeriodView, RecordingPeriod,
    SourceTrack, MIN_COPY_DURATION_MS,
};
pub use site::{
    link_target, next_order, repoint_entry, RawSiteListing, SiteEntry, SiteListing,
    SITE_PROFILES_PATH, SITE_STREAMS_PATH,
};
pub use stream::{
    AudioTrackConfig, AudioTracks, FrameSnapshot, RecordingConfig, Retention, Stream,
    StreamPatch, StreamQuality, StreamStatus,
};

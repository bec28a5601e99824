//! Configure and probe

use tracing::{debug, info};

use super::playout::playout_formats;
use super::LifecycleService;
use crate::codec::{build_ladder_config, decode_live_config, drm_from_encryption, LIVE_CONFIG_PATH};
use crate::error::{Error, Result};
use crate::fabric::{InitOptions, ProbeResult, StreamSettings};
use crate::models::{AudioTrackConfig, AudioTracks, StreamPatch};

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigureOptions {
    /// Rewrite the configured audio tracks to match what the probe found
    pub sync_audio_with_probe: bool,
}

/// Reconcile configured audio tracks with a probe result.
///
/// Probe-only tracks are added as recorded tracks, configured tracks the
/// probe did not see are dropped, and a single probed track is always
/// recorded.
#[must_use]
pub fn sync_audio_tracks(current: &AudioTracks, probe: &ProbeResult) -> AudioTracks {
    let mut synced: AudioTracks = probe
        .audio_streams
        .iter()
        .map(|stream| {
            let track = current.get(&stream.stream_index).cloned().unwrap_or_else(|| {
                AudioTrackConfig {
                    record: true,
                    playout: true,
                    playout_label: None,
                    lang: stream.lang.clone(),
                    default: false,
                    recording_channels: stream.channels,
                    recording_bitrate: stream.bit_rate,
                }
            });
            (stream.stream_index, track)
        })
        .collect();

    if probe.audio_streams.len() == 1 {
        for track in synced.values_mut() {
            track.record = true;
        }
    }

    synced
}

impl LifecycleService {
    /// Push the stored config through the configure and init primitives.
    ///
    /// The ladder comes from the stream's playout profile (the default
    /// profile when none is set). Afterwards the site link is repointed at the
    /// new version and the cached status refreshed.
    pub async fn configure(&self, slug: &str, options: ConfigureOptions) -> Result<ProbeResult> {
        let location = self.locate(slug).await?;

        let stored = self
            .fabric
            .content_object_metadata(&location.library_id, &location.object_id, LIVE_CONFIG_PATH, false)
            .await?;
        let fields = decode_live_config(stored.as_ref())?;

        let profiles = self.ladder_profiles().await?;
        let profile = profiles
            .resolve(fields.playout_profile.as_deref())
            .ok_or_else(|| Error::ProfileNotFound(fields.playout_profile.clone().unwrap_or_default()))?;
        let ladder = if profile.ladder_specs.video.is_empty() && profile.ladder_specs.audio.is_empty() {
            None
        } else {
            Some(build_ladder_config(profile, &fields.audio, true).map_err(Error::InvalidInput)?)
        };

        let settings = StreamSettings {
            audio: fields.audio.clone(),
            part_ttl: fields.retention.seconds(),
            persistent: fields.retention.is_persistent(),
            connection_timeout: fields.connection_timeout,
            reconnect_timeout: fields.reconnect_timeout,
            url: fields.url.clone(),
            ladder,
            copy_mpegts: fields.ts_passthrough,
        };

        let probe = self.fabric.stream_config(&location.object_id, &settings).await?;
        debug!(slug = %slug, audio_streams = probe.audio_streams.len(), "Stream probed");

        self.fabric
            .stream_init(
                &location.object_id,
                &InitOptions {
                    drm: drm_from_encryption(&fields.encryption),
                    formats: playout_formats(&fields.encryption),
                },
            )
            .await?;

        let mut recording = fields.recording_config();
        if options.sync_audio_with_probe {
            let synced = sync_audio_tracks(&fields.audio, &probe);
            if synced != fields.audio {
                let write_token = self.edit(&location).await?;
                self.fabric
                    .replace_metadata(
                        &location.library_id,
                        &location.object_id,
                        &write_token,
                        &format!("{LIVE_CONFIG_PATH}/audio"),
                        serde_json::to_value(&synced)?,
                    )
                    .await?;
                self.finalize(&location, &write_token, "Sync audio tracks with probe")
                    .await?;
                info!(slug = %slug, tracks = synced.len(), "Audio tracks synced with probe");
            }
            recording.audio = synced;
        }

        let hash = self.fabric.latest_version_hash(&location.object_id).await?;
        self.repoint_site_entry(slug, &hash).await?;

        self.cache.update_stream(
            slug,
            StreamPatch {
                recording: Some(recording),
                ..StreamPatch::default()
            },
        );
        self.refresh_status(&location).await;

        info!(slug = %slug, "Stream configured");
        Ok(probe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_live_config, LiveConfigFields};
    use crate::fabric::{FabricClient, ProbeAudioStream};
    use crate::models::{SiteListing, StreamStatus, SITE_STREAMS_PATH};
    use crate::test_helpers::{StreamFixture, TestHarness};
    use serde_json::json;

    fn probe(indexes: &[u32]) -> ProbeResult {
        ProbeResult {
            audio_streams: indexes
                .iter()
                .map(|i| ProbeAudioStream {
                    stream_index: *i,
                    channels: Some(2),
                    bit_rate: Some(192_000),
                    codec_name: Some("aac".into()),
                    lang: None,
                })
                .collect(),
            video_stream_count: 1,
        }
    }

    fn track(record: bool) -> AudioTrackConfig {
        AudioTrackConfig {
            record,
            playout: record,
            ..AudioTrackConfig::default()
        }
    }

    #[test]
    fn test_sync_adds_and_removes_tracks() {
        let current = AudioTracks::from([(1, track(true)), (5, track(true))]);

        let synced = sync_audio_tracks(&current, &probe(&[1, 2]));

        assert_eq!(synced.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(synced[&2].recording_channels, Some(2));
        assert!(synced[&2].record);
    }

    #[test]
    fn test_sync_forces_single_track_recorded() {
        let current = AudioTracks::from([(1, track(false))]);
        let synced = sync_audio_tracks(&current, &probe(&[1]));
        assert!(synced[&1].record);

        let current = AudioTracks::from([(1, track(false)), (2, track(true))]);
        let synced = sync_audio_tracks(&current, &probe(&[1, 2]));
        assert!(!synced[&1].record);
    }

    #[tokio::test]
    async fn test_configure_writes_settings_and_repoints_link() {
        let harness = TestHarness::new();
        let fixture = StreamFixture::new("foo").with_status(StreamStatus::Uninitialized);
        let id = fixture.object_id().clone();
        let stream = fixture.install(&harness.fabric, &harness.cache);
        let library = stream.library_id.unwrap();

        let fields = LiveConfigFields {
            encryption: "drm-public".into(),
            audio: AudioTracks::from([(1, track(true))]),
            ..LiveConfigFields::default()
        };
        let token = harness.fabric.edit_content_object(&library, &id).await.unwrap();
        harness
            .fabric
            .merge_metadata(&library, &id, &token, LIVE_CONFIG_PATH, serde_json::to_value(encode_live_config(&fields)).unwrap())
            .await
            .unwrap();
        harness.fabric.set_probe(&id, probe(&[1, 2]));

        let result = harness
            .lifecycle
            .configure("foo", ConfigureOptions { sync_audio_with_probe: true })
            .await
            .unwrap();

        assert_eq!(result.audio_streams.len(), 2);
        let settings = harness.fabric.stream_settings();
        assert_eq!(settings.len(), 1);
        assert_eq!(settings[0].part_ttl, Some(86_400));
        assert!(settings[0].ladder.is_none());

        let audio = harness.fabric.metadata(&id, "live_recording_config/audio").unwrap();
        assert_eq!(audio.as_object().unwrap().len(), 2);
        assert_eq!(harness.cache.get("foo").unwrap().recording.audio.len(), 2);

        let listing: SiteListing =
            serde_json::from_value(harness.fabric.site_metadata(SITE_STREAMS_PATH).unwrap()).unwrap();
        let expected = harness.fabric.object(&id).unwrap().hash(&id);
        assert!(listing["foo"].link.contains(&expected));
        assert_eq!(harness.cache.get("foo").unwrap().status, Some(StreamStatus::Inactive));
    }

    #[tokio::test]
    async fn test_configure_unknown_profile() {
        let harness = TestHarness::new();
        let fixture = StreamFixture::new("foo");
        let id = fixture.object_id().clone();
        let stream = fixture.install(&harness.fabric, &harness.cache);
        let library = stream.library_id.unwrap();
        let token = harness.fabric.edit_content_object(&library, &id).await.unwrap();
        harness
            .fabric
            .merge_metadata(&library, &id, &token, LIVE_CONFIG_PATH, json!({"playout_ladder_profile": "4k"}))
            .await
            .unwrap();

        let err = harness.lifecycle.configure("foo", ConfigureOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::ProfileNotFound(name) if name == "4k"));
        assert_eq!(harness.fabric.call_count("stream_config"), 0);
    }

    #[tokio::test]
    async fn test_configure_refuses_malformed_live_config() {
        let harness = TestHarness::new();
        let fixture = StreamFixture::new("foo");
        let id = fixture.object_id().clone();
        let stream = fixture.install(&harness.fabric, &harness.cache);
        let library = stream.library_id.unwrap();
        let token = harness.fabric.edit_content_object(&library, &id).await.unwrap();
        harness
            .fabric
            .merge_metadata(
                &library,
                &id,
                &token,
                LIVE_CONFIG_PATH,
                json!({ "url": "srt://origin:9000", "part_ttl": "one day" }),
            )
            .await
            .unwrap();

        let err = harness.lifecycle.configure("foo", ConfigureOptions::default()).await.unwrap_err();

        assert!(matches!(err, Error::Serialization(_)));
        assert_eq!(harness.fabric.call_count("stream_config"), 0);
        assert_eq!(harness.fabric.call_count("stream_init"), 0);
        let stored = harness.fabric.metadata(&id, LIVE_CONFIG_PATH).unwrap();
        assert_eq!(stored["url"], "srt://origin:9000");
    }
}

//! Playout settings: DRM, watermark, DVR and ladder in one transaction

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{LifecycleService, StreamLocation};
use crate::codec::{drm_from_encryption, LIVE_CONFIG_PATH};
use crate::error::{Error, FailurePolicy, Result};
use crate::models::{
    active_watermark_kinds, DvrSettings, StreamPatch, StreamStatus, Watermark, WriteToken,
};

pub const PLAYOUT_CONFIG_PATH: &str = "live_recording/playout_config";

/// Playout formats enabled for an encryption selection
#[must_use]
pub fn playout_formats(encryption: &str) -> Vec<String> {
    let formats: &[&str] = match encryption {
        "drm-public" => &["hls-aes128", "dash-widevine"],
        "drm-fairplay" => &["hls-fairplay"],
        "drm-all" => &["hls-fairplay", "hls-sample-aes", "hls-aes128", "dash-widevine"],
        e if e.contains("clear") => &["hls-clear", "dash-clear"],
        _ => &[],
    };
    formats.iter().map(ToString::to_string).collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum WatermarkChange {
    #[default]
    Keep,
    Clear,
    Set(Watermark),
}

/// Requested playout changes. `None` leaves a setting as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayoutSettings {
    pub drm_type: Option<String>,
    pub watermark: WatermarkChange,
    pub dvr: Option<DvrSettings>,
    pub ladder_profile: Option<String>,
}

impl PlayoutSettings {
    /// Sub-writes that have something to do
    fn requested(&self, dvr_skipped: bool) -> Vec<&'static str> {
        [
            ("drm", self.drm_type.is_some()),
            ("watermark", self.watermark != WatermarkChange::Keep),
            ("dvr", self.dvr.is_some() && !dvr_skipped),
            ("ladder", self.ladder_profile.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, wanted)| wanted.then_some(name))
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayoutOutcome {
    pub hash: String,
    /// DVR was requested but the stream was not inactive or stopped
    pub dvr_skipped: bool,
}

impl LifecycleService {
    /// Apply playout settings under one write token.
    ///
    /// The four sub-writes run independently. When some fail, the others
    /// are still committed and [`Error::PlayoutIncomplete`] names the failed
    /// ones. When every requested sub-write fails nothing is committed.
    pub async fn apply_playout_settings(
        &self,
        slug: &str,
        settings: PlayoutSettings,
    ) -> Result<PlayoutOutcome> {
        let location = self.locate(slug).await?;
        let status = self.cache.get(slug).and_then(|s| s.status);
        let dvr_skipped = settings.dvr.is_some() && !status.is_some_and(|s| s.allows_offline_edits());

        let write_token = self.edit(&location).await?;

        let (drm, watermark, dvr, ladder) = tokio::join!(
            FailurePolicy::BestEffort.run("playout_drm", self.write_drm(&location, &write_token, settings.drm_type.as_deref())),
            FailurePolicy::BestEffort.run("playout_watermark", self.write_watermark(&location, &write_token, &settings.watermark)),
            FailurePolicy::BestEffort.run("playout_dvr", self.write_dvr(&location, &write_token, settings.dvr.as_ref(), status)),
            FailurePolicy::BestEffort.run("playout_ladder", self.write_ladder_profile(&location, &write_token, settings.ladder_profile.as_deref())),
        );

        let mut failed = Vec::new();
        for (name, result) in [("drm", drm?), ("watermark", watermark?), ("dvr", dvr?), ("ladder", ladder?)] {
            if result.is_none() {
                failed.push(name);
            }
        }

        let requested = settings.requested(dvr_skipped);
        if !failed.is_empty() && failed.len() == requested.len() {
            warn!(slug = %slug, failed = ?failed, "Every playout sub-write failed, nothing committed");
            return Err(Error::PlayoutIncomplete {
                slug: slug.to_string(),
                failed,
                committed: None,
            });
        }

        let hash = self
            .finalize(&location, &write_token, "Update playout settings")
            .await?;
        FailurePolicy::BestEffort
            .run("repoint_site_entry", self.repoint_site_entry(slug, &hash))
            .await?;

        if let Some(stream) = self.cache.get(slug) {
            let mut playout = stream.playout;
            if !failed.contains(&"drm") {
                if let Some(drm_type) = settings.drm_type {
                    playout.drm_type = Some(drm_type);
                }
            }
            if !failed.contains(&"watermark") {
                match settings.watermark {
                    WatermarkChange::Keep => {}
                    WatermarkChange::Clear => playout.watermark = None,
                    WatermarkChange::Set(watermark) => playout.watermark = Some(watermark),
                }
            }
            if !failed.contains(&"dvr") && !dvr_skipped {
                if let Some(dvr) = settings.dvr {
                    playout.dvr = dvr;
                }
            }
            if !failed.contains(&"ladder") {
                if let Some(profile) = settings.ladder_profile {
                    playout.ladder_profile = Some(profile);
                }
            }
            self.cache.update_stream(
                slug,
                StreamPatch {
                    playout: Some(playout),
                    ..StreamPatch::default()
                },
            );
        }

        if !failed.is_empty() {
            warn!(slug = %slug, failed = ?failed, hash = %hash, "Playout settings partially applied");
            return Err(Error::PlayoutIncomplete {
                slug: slug.to_string(),
                failed,
                committed: Some(hash),
            });
        }

        info!(slug = %slug, "Playout settings applied");
        Ok(PlayoutOutcome { hash, dvr_skipped })
    }

    async fn write_drm(
        &self,
        location: &StreamLocation,
        write_token: &WriteToken,
        drm_type: Option<&str>,
    ) -> Result<()> {
        let Some(drm_type) = drm_type else {
            return Ok(());
        };

        self.fabric
            .merge_metadata(
                &location.library_id,
                &location.object_id,
                write_token,
                PLAYOUT_CONFIG_PATH,
                json!({
                    "drm_type": drm_type,
                    "playout_formats": playout_formats(drm_type),
                }),
            )
            .await?;

        let mut config = json!({ "drm_type": drm_type });
        if let Some(drm) = drm_from_encryption(drm_type) {
            config["drm"] = Value::String(drm);
        }
        self.fabric
            .merge_metadata(&location.library_id, &location.object_id, write_token, LIVE_CONFIG_PATH, config)
            .await?;
        Ok(())
    }

    /// Keep at most one watermark kind. Switching kinds removes the old one
    /// and adds the new one on the same token.
    async fn write_watermark(
        &self,
        location: &StreamLocation,
        write_token: &WriteToken,
        change: &WatermarkChange,
    ) -> Result<()> {
        if *change == WatermarkChange::Keep {
            return Ok(());
        }

        let playout = self
            .fabric
            .content_object_metadata(&location.library_id, &location.object_id, PLAYOUT_CONFIG_PATH, false)
            .await?
            .unwrap_or(Value::Null);
        let active = active_watermark_kinds(&playout);

        let (stale, add) = match change {
            WatermarkChange::Keep => return Ok(()),
            WatermarkChange::Clear => (active, None),
            WatermarkChange::Set(watermark) => (
                active.into_iter().filter(|kind| *kind != watermark.kind()).collect(),
                Some(watermark),
            ),
        };

        if !stale.is_empty() {
            self.fabric
                .stream_remove_watermark(&location.object_id, write_token, &stale)
                .await?;
        }
        if let Some(watermark) = add {
            self.fabric
                .stream_add_watermark(&location.object_id, write_token, watermark)
                .await?;
        }
        Ok(())
    }

    /// DVR can only change while the stream is inactive or stopped
    async fn write_dvr(
        &self,
        location: &StreamLocation,
        write_token: &WriteToken,
        dvr: Option<&DvrSettings>,
        status: Option<StreamStatus>,
    ) -> Result<()> {
        let Some(dvr) = dvr else {
            return Ok(());
        };
        if !status.is_some_and(|s| s.allows_offline_edits()) {
            debug!(slug = %location.slug, status = ?status, "Skipping DVR update while stream is active");
            return Ok(());
        }

        self.fabric
            .merge_metadata(
                &location.library_id,
                &location.object_id,
                write_token,
                PLAYOUT_CONFIG_PATH,
                json!({
                    "dvr_enabled": dvr.enabled,
                    "dvr_start_time": dvr.start_time.map(|t| t.to_rfc3339()),
                    "dvr_max_duration": dvr.max_duration,
                }),
            )
            .await?;
        Ok(())
    }

    async fn write_ladder_profile(
        &self,
        location: &StreamLocation,
        write_token: &WriteToken,
        profile: Option<&str>,
    ) -> Result<()> {
        let Some(profile) = profile else {
            return Ok(());
        };
        self.write_ladder(location, write_token, Some(profile), false)
            .await
            .map(|_| ())
    }
}

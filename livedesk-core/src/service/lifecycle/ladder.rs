//! Ladder profiles: the site-level profile document and per-stream ladders

use serde_json::json;
use tracing::info;

use super::{LifecycleService, StreamLocation};
use crate::codec::{build_ladder_config, decode_live_config, LIVE_CONFIG_PATH};
use crate::error::{Error, FailurePolicy, Result};
use crate::models::{LadderConfig, ProfileDocument, StreamPatch, WriteToken, SITE_PROFILES_PATH};

/// Stream metadata path of the persisted ladder
pub const RECORDING_PARAMS_PATH: &str = "live_recording/recording_config/recording_params";

impl LifecycleService {
    /// Read the site profile document. A missing document is the default.
    pub async fn ladder_profiles(&self) -> Result<ProfileDocument> {
        self.read_metadata(&self.site.library_id, &self.site.object_id, SITE_PROFILES_PATH)
            .await
    }

    /// Replace the site profile document in one commit
    pub async fn save_ladder_profiles(&self, document: &ProfileDocument) -> Result<String> {
        document.validate().map_err(Error::InvalidInput)?;

        let site = StreamLocation {
            slug: String::new(),
            object_id: self.site.object_id.clone(),
            library_id: self.site.library_id.clone(),
        };
        let write_token = self.edit(&site).await?;
        self.fabric
            .replace_metadata(
                &site.library_id,
                &site.object_id,
                &write_token,
                SITE_PROFILES_PATH,
                serde_json::to_value(document)?,
            )
            .await?;
        let hash = self
            .finalize(&site, &write_token, "Update ladder profiles")
            .await?;
        info!(custom = document.custom.len(), "Ladder profiles saved");
        Ok(hash)
    }

    /// Apply a named profile to a stream in its own commit.
    ///
    /// `None` selects the default profile. `initial` marks the first
    /// application, where a single recorded track is forced default.
    pub async fn update_ladder_profile(
        &self,
        slug: &str,
        profile: Option<&str>,
        initial: bool,
    ) -> Result<LadderConfig> {
        let location = self.locate(slug).await?;
        let write_token = self.edit(&location).await?;
        let ladder = self
            .write_ladder(&location, &write_token, profile, initial)
            .await?;
        let hash = self
            .finalize(&location, &write_token, "Update playout ladder profile")
            .await?;
        FailurePolicy::BestEffort
            .run("repoint_site_entry", self.repoint_site_entry(slug, &hash))
            .await?;

        if let Some(stream) = self.cache.get(slug) {
            let mut playout = stream.playout;
            playout.ladder_profile = profile.map(ToString::to_string);
            self.cache.update_stream(
                slug,
                StreamPatch {
                    playout: Some(playout),
                    ..StreamPatch::default()
                },
            );
        }

        info!(slug = %slug, profile = ?profile, n_audio = ladder.n_audio, "Ladder profile applied");
        Ok(ladder)
    }

    /// Expand `profile` against the stream's recorded tracks and write the
    /// result under an open write token
    pub(super) async fn write_ladder(
        &self,
        location: &StreamLocation,
        write_token: &WriteToken,
        profile: Option<&str>,
        initial: bool,
    ) -> Result<LadderConfig> {
        let profiles = self.ladder_profiles().await?;
        let resolved = profiles
            .resolve(profile)
            .ok_or_else(|| Error::ProfileNotFound(profile.unwrap_or_default().to_string()))?;

        let stored = self
            .fabric
            .content_object_metadata(&location.library_id, &location.object_id, LIVE_CONFIG_PATH, false)
            .await?;
        let fields = decode_live_config(stored.as_ref())?;
        let ladder = build_ladder_config(resolved, &fields.audio, initial).map_err(Error::InvalidInput)?;

        self.fabric
            .replace_metadata(
                &location.library_id,
                &location.object_id,
                write_token,
                &format!("{RECORDING_PARAMS_PATH}/ladder_specs"),
                serde_json::to_value(&ladder.ladder_specs)?,
            )
            .await?;
        self.fabric
            .merge_metadata(
                &location.library_id,
                &location.object_id,
                write_token,
                &format!("{RECORDING_PARAMS_PATH}/xc_params"),
                json!({
                    "audio_bitrate": ladder.audio_bitrate,
                    "video_bitrate": ladder.video_bitrate,
                    "n_audio": ladder.n_audio,
                    "audio_index": ladder.audio_index,
                }),
            )
            .await?;
        self.fabric
            .merge_metadata(
                &location.library_id,
                &location.object_id,
                write_token,
                LIVE_CONFIG_PATH,
                json!({ "playout_ladder_profile": profile }),
            )
            .await?;

        Ok(ladder)
    }
}

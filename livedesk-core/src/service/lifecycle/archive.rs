//! Recording periods and copy-to-VoD

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::{LifecycleService, StreamLocation};
use crate::codec::{decode_live_config, LIVE_CONFIG_PATH};
use crate::error::{Error, FailurePolicy, Result};
use crate::fabric::{CopyToVodRequest, FabricError, ObjectPermission};
use crate::models::{LibraryId, LiveRecordingCopy, ObjectId, PeriodView, RecordingPeriod};

pub const RECORDINGS_PATH: &str = "live_recording/recordings";
pub const RECORDING_COPIES_PATH: &str = "live_recording_copies";

/// Copies keyed by target object id
pub type RecordingCopies = BTreeMap<String, LiveRecordingCopy>;

#[derive(Debug, Clone)]
pub struct CopyToVodOptions {
    /// One or more periods; several are copied as one continuous range
    pub periods: Vec<RecordingPeriod>,
    pub library_id: LibraryId,
    pub title: Option<String>,
    pub content_type: Option<String>,
    pub permission: ObjectPermission,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    pub target_object_id: ObjectId,
    pub copy: LiveRecordingCopy,
}

impl LifecycleService {
    /// Recording periods of a stream, annotated with archival availability
    pub async fn recording_periods(&self, slug: &str) -> Result<Vec<PeriodView>> {
        let location = self.locate(slug).await?;
        let recordings = self
            .fabric
            .content_object_metadata(&location.library_id, &location.object_id, RECORDINGS_PATH, false)
            .await?
            .unwrap_or(Value::Null);
        let config = self
            .fabric
            .content_object_metadata(&location.library_id, &location.object_id, LIVE_CONFIG_PATH, false)
            .await?;
        let retention = decode_live_config(config.as_ref())?.retention;

        let now = Utc::now();
        Ok(RecordingPeriod::list_from_metadata(&recordings)
            .into_iter()
            .map(|period| PeriodView {
                availability: period.availability(retention, now),
                period,
            })
            .collect())
    }

    /// Archive recorded periods into a new VoD object.
    ///
    /// The target object is created and finalized before the copy starts, so
    /// a failed copy leaves an empty target behind.
    pub async fn copy_to_vod(&self, slug: &str, options: CopyToVodOptions) -> Result<CopyOutcome> {
        let mut periods = options.periods;
        periods.sort_by_key(|p| p.start_time);
        let (Some(first), Some(last)) = (periods.first(), periods.last()) else {
            return Err(Error::InvalidInput("Select at least one recording period".to_string()));
        };

        let now = Utc::now();
        let start_time = first.start();
        let end_time = last.end_or(now);
        let recording_period = (periods.len() == 1).then_some(first.id);

        let source = self.locate(slug).await?;

        let created = self
            .fabric
            .create_content_object(&options.library_id, options.content_type.as_deref())
            .await?;
        let target = StreamLocation {
            slug: slug.to_string(),
            object_id: created.object_id.clone(),
            library_id: options.library_id.clone(),
        };
        if let Some(title) = &options.title {
            self.fabric
                .merge_metadata(
                    &target.library_id,
                    &target.object_id,
                    &created.write_token,
                    "public",
                    json!({ "name": title, "asset_metadata": { "title": title } }),
                )
                .await?;
        }
        self.finalize(&target, &created.write_token, "Create VoD from live recording")
            .await?;

        self.fabric
            .set_permission(&target.object_id, options.permission)
            .await?;
        if let Some(group) = &self.access_group {
            FailurePolicy::BestEffort
                .run(
                    "add_group_permission",
                    self.fabric.add_group_permission(&target.object_id, group),
                )
                .await?;
        }

        let request = CopyToVodRequest {
            object_id: source.object_id.clone(),
            target_library_id: target.library_id.clone(),
            target_object_id: target.object_id.clone(),
            start_time,
            end_time,
            recording_period,
        };
        let response = self
            .fabric
            .stream_copy_to_vod(&request)
            .await?
            .filter(|value| !value.is_null())
            .ok_or_else(|| Error::PartNotAvailable(slug.to_string()))?;
        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            return Err(FabricError::remote("stream_copy_to_vod", error).into());
        }

        let copy = LiveRecordingCopy {
            target_object_id: target.object_id.clone(),
            target_library_id: Some(target.library_id.clone()),
            start_time,
            end_time,
            create_time: now,
            title: options.title,
        };
        let mut copies = self.live_recording_copies(slug).await?;
        copies.insert(target.object_id.to_string(), copy.clone());
        self.write_recording_copies(&source, &copies, "Add live recording copy")
            .await?;

        info!(
            slug = %slug,
            target_object_id = %target.object_id,
            periods = periods.len(),
            "Live recording copied to VoD"
        );
        Ok(CopyOutcome {
            target_object_id: target.object_id,
            copy,
        })
    }

    pub async fn live_recording_copies(&self, slug: &str) -> Result<RecordingCopies> {
        let location = self.locate(slug).await?;
        self.read_metadata(&location.library_id, &location.object_id, RECORDING_COPIES_PATH)
            .await
    }

    /// Drop a copy entry from the source stream. The VoD object is untouched.
    pub async fn remove_live_recording_copy(&self, slug: &str, target: &ObjectId) -> Result<bool> {
        let location = self.locate(slug).await?;
        let mut copies = self.live_recording_copies(slug).await?;
        if copies.remove(target.as_str()).is_none() {
            warn!(slug = %slug, target_object_id = %target, "No such live recording copy");
            return Ok(false);
        }
        self.write_recording_copies(&location, &copies, "Remove live recording copy")
            .await?;
        Ok(true)
    }

    async fn write_recording_copies(
        &self,
        location: &StreamLocation,
        copies: &RecordingCopies,
        message: &str,
    ) -> Result<String> {
        let write_token = self.edit(location).await?;
        self.fabric
            .replace_metadata(
                &location.library_id,
                &location.object_id,
                &write_token,
                RECORDING_COPIES_PATH,
                serde_json::to_value(copies)?,
            )
            .await?;
        self.finalize(location, &write_token, message).await
    }
}

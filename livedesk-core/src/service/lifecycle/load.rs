//! Full reload, recording settings and directory listings

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::playout::PLAYOUT_CONFIG_PATH;
use super::LifecycleService;
use crate::codec::{
    decode_live_config, encode_live_config, overlay_live_config, LiveConfigFields, LIVE_CONFIG_PATH,
};
use crate::error::{Error, FailurePolicy, Result};
use crate::fabric::{AccessGroup, Library};
use crate::models::{DvrSettings, ObjectId, SiteEntry, Stream, StreamPatch, Watermark};
use crate::service::poller::SweepTrigger;
use crate::validation;

fn text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn dvr_from_playout(playout: &Value) -> DvrSettings {
    DvrSettings {
        enabled: playout.get("dvr_enabled").and_then(Value::as_bool).unwrap_or(false),
        start_time: playout
            .get("dvr_start_time")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc)),
        max_duration: playout.get("dvr_max_duration").and_then(Value::as_u64),
    }
}

impl LifecycleService {
    /// Rebuild the whole cache from the site listing, then force a status
    /// sweep. Entries whose object cannot be read are cached bare.
    pub async fn load_streams(&self) -> Result<usize> {
        let listing = self.read_site_listing().await?;

        let streams: HashMap<String, Stream> = futures::stream::iter(listing)
            .map(|(slug, entry)| async move {
                let (object_id, loaded) = match self.entry_object_id(&entry).await {
                    Ok(object_id) => {
                        let loaded = self.load_stream(&slug, &entry, &object_id).await;
                        (Some(object_id), loaded)
                    }
                    Err(e) => (None, Err(e)),
                };
                let stream = match loaded {
                    Ok(stream) => stream,
                    Err(e) => {
                        warn!(slug = %slug, link = %entry.link, error = %e, "Failed to load stream, caching bare entry");
                        Stream {
                            object_id,
                            library_id: entry.library_id.clone(),
                            order: Some(entry.order),
                            title: slug.clone(),
                            ..Stream::new(slug.clone())
                        }
                    }
                };
                (slug, stream)
            })
            .buffer_unordered(self.fan_out)
            .collect()
            .await;

        let count = streams.len();
        self.cache.replace_all(streams);
        info!(count, "Streams loaded from site listing");

        let report = self.poller.sweep(SweepTrigger::Forced).await;
        debug!(updated = report.updated, failed = report.failed, "Initial status sweep finished");
        Ok(count)
    }

    /// Object behind a site entry. Link-only entries are resolved from the
    /// version hash they point at.
    async fn entry_object_id(&self, entry: &SiteEntry) -> Result<ObjectId> {
        if let Some(object_id) = &entry.object_id {
            return Ok(object_id.clone());
        }
        let hash = entry
            .version_hash()
            .ok_or_else(|| Error::Internal(format!("site link {} names no version", entry.link)))?;
        Ok(self.fabric.object_id_for_hash(hash).await?)
    }

    async fn load_stream(&self, slug: &str, entry: &SiteEntry, object_id: &ObjectId) -> Result<Stream> {
        let library_id = match &entry.library_id {
            Some(id) => id.clone(),
            None => self.fabric.content_object_library_id(object_id).await?,
        };

        let public = self
            .fabric
            .content_object_metadata(&library_id, object_id, "public", false)
            .await?
            .unwrap_or(Value::Null);
        let live_config = self
            .fabric
            .content_object_metadata(&library_id, object_id, LIVE_CONFIG_PATH, false)
            .await?;
        let playout = self
            .fabric
            .content_object_metadata(&library_id, object_id, PLAYOUT_CONFIG_PATH, false)
            .await?
            .unwrap_or(Value::Null);

        let fields = decode_live_config(live_config.as_ref())?;
        let asset = public.get("asset_metadata").cloned().unwrap_or(Value::Null);

        let mut playout_config = fields.playout_config();
        if let Some(drm_type) = text(&playout, "drm_type") {
            playout_config.drm_type = Some(drm_type);
        }
        playout_config.watermark = Watermark::from_playout_metadata(&playout);
        playout_config.dvr = dvr_from_playout(&playout);

        Ok(Stream {
            object_id: Some(object_id.clone()),
            library_id: Some(library_id),
            order: Some(entry.order),
            title: text(&asset, "title")
                .or_else(|| text(&public, "name"))
                .unwrap_or_else(|| slug.to_string()),
            display_title: text(&asset, "display_title"),
            description: text(&public, "description"),
            recording: fields.recording_config(),
            playout: playout_config,
            ..Stream::new(slug)
        })
    }

    /// Re-encode edited recording settings into the live config in one commit.
    /// The stored document is replaced, so cleared fields are removed.
    pub async fn update_recording_settings(&self, slug: &str, fields: LiveConfigFields) -> Result<String> {
        let retention = fields.retention.seconds().map_or_else(String::new, |s| s.to_string());
        let problems = [
            validation::validate_origin_url(fields.url.as_deref()),
            validation::validate_reconnect_timeout(fields.reconnect_timeout),
            (!fields.retention.is_persistent())
                .then(|| validation::validate_retention(&retention))
                .flatten(),
        ];
        if let Some(message) = problems.into_iter().flatten().next() {
            return Err(Error::InvalidInput(message));
        }

        let location = self.locate(slug).await?;
        let encoded = encode_live_config(&fields);
        let stored = self
            .fabric
            .content_object_metadata(&location.library_id, &location.object_id, LIVE_CONFIG_PATH, false)
            .await?;
        let document = overlay_live_config(stored, &encoded)?;
        let write_token = self.edit(&location).await?;
        self.fabric
            .replace_metadata(
                &location.library_id,
                &location.object_id,
                &write_token,
                LIVE_CONFIG_PATH,
                document,
            )
            .await?;
        let hash = self
            .finalize(&location, &write_token, "Update recording settings")
            .await?;
        FailurePolicy::BestEffort
            .run("repoint_site_entry", self.repoint_site_entry(slug, &hash))
            .await?;

        let stored = encoded.into_fields();
        let playout = self.cache.get(slug).map(|stream| {
            let mut playout = stream.playout;
            playout.drm_type = stored.playout_config().drm_type;
            playout.ladder_profile = stored.playout_profile.clone();
            playout
        });
        self.cache.update_stream(
            slug,
            StreamPatch {
                recording: Some(stored.recording_config()),
                playout,
                ..StreamPatch::default()
            },
        );

        info!(slug = %slug, "Recording settings updated");
        Ok(hash)
    }

    /// Content libraries with their names resolved. A failed name lookup
    /// leaves that name empty.
    pub async fn libraries(&self) -> Result<Vec<Library>> {
        let ids = self.fabric.content_libraries().await?;

        let mut libraries: Vec<Library> = futures::stream::iter(ids)
            .map(|id| async move {
                let name = FailurePolicy::BestEffort
                    .run("library_name", self.fabric.library_name(&id))
                    .await
                    .ok()
                    .flatten()
                    .flatten();
                Library { id, name }
            })
            .buffer_unordered(self.fan_out)
            .collect()
            .await;

        libraries.sort_by(|a, b| {
            a.name
                .as_deref()
                .unwrap_or(a.id.as_str())
                .cmp(b.name.as_deref().unwrap_or(b.id.as_str()))
        });
        Ok(libraries)
    }

    pub async fn access_groups(&self) -> Result<Vec<AccessGroup>> {
        Ok(self.fabric.access_groups().await?)
    }

    pub async fn drm_schemes(&self) -> Result<Vec<String>> {
        Ok(self.fabric.drm_schemes().await?)
    }
}

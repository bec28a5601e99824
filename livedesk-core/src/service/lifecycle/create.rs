use serde_json::json;
use tracing::info;

use super::{LifecycleService, StreamLocation};
use crate::codec::{encode_live_config, slugify, LiveConfigFields, LIVE_CONFIG_PATH};
use crate::error::{Error, FailurePolicy, Result};
use crate::fabric::{LinkSpec, ObjectPermission};
use crate::models::{LibraryId, ObjectId, StreamPatch};
use crate::validation;

/// Input of [`LifecycleService::create`]
#[derive(Debug, Clone)]
pub struct CreateStreamRequest {
    pub name: String,
    pub display_title: Option<String>,
    pub description: Option<String>,
    pub library_id: LibraryId,
    pub permission: ObjectPermission,
    pub live_config: LiveConfigFields,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedStream {
    pub object_id: ObjectId,
    pub slug: String,
}

impl LifecycleService {
    /// Create a stream object, link it from the site and cache it.
    ///
    /// Resubmitting the same request creates a second object.
    pub async fn create(&self, request: CreateStreamRequest) -> Result<CreatedStream> {
        if let Some(message) = validation::validate_stream_name(&request.name) {
            return Err(Error::InvalidInput(message));
        }
        if let Some(message) = validation::validate_origin_url(request.live_config.url.as_deref()) {
            return Err(Error::InvalidInput(message));
        }
        let name = request.name.trim().to_string();
        let slug = slugify(&name);
        if self.cache.get(&slug).is_some() {
            return Err(Error::InvalidInput(format!("A stream with slug \"{slug}\" already exists")));
        }

        let created = self
            .fabric
            .create_content_object(&request.library_id, self.stream_content_type.as_deref())
            .await?;
        let location = StreamLocation {
            slug: slug.clone(),
            object_id: created.object_id.clone(),
            library_id: request.library_id.clone(),
        };
        info!(slug = %slug, object_id = %location.object_id, "Stream object created");

        if let Some(group) = &self.access_group {
            FailurePolicy::BestEffort
                .run(
                    "add_group_permission",
                    self.fabric.add_group_permission(&location.object_id, group),
                )
                .await?;
        }

        let live_config = encode_live_config(&request.live_config);
        self.fabric
            .merge_metadata(
                &location.library_id,
                &location.object_id,
                &created.write_token,
                LIVE_CONFIG_PATH,
                serde_json::to_value(&live_config)?,
            )
            .await?;

        let display_title = request.display_title.clone().unwrap_or_else(|| name.clone());
        self.fabric
            .merge_metadata(
                &location.library_id,
                &location.object_id,
                &created.write_token,
                "public",
                json!({
                    "name": name,
                    "description": request.description.clone().unwrap_or_default(),
                    "asset_metadata": {
                        "title": name,
                        "display_title": display_title,
                        "slug": slug,
                        "title_type": "live_stream",
                        "video_type": "live",
                    },
                }),
            )
            .await?;

        self.fabric
            .create_links(
                &location.library_id,
                &location.object_id,
                &created.write_token,
                &[LinkSpec {
                    path: "public/asset_metadata/sources/default".to_string(),
                    target: "playout/default/options.json".to_string(),
                    kind: "rep".to_string(),
                }],
            )
            .await?;

        let hash = self
            .finalize(&location, &created.write_token, "Create live stream")
            .await?;

        let order = self
            .add_site_entry(&slug, &location.object_id, &location.library_id, &hash)
            .await?;

        FailurePolicy::BestEffort
            .run(
                "set_permission",
                self.fabric.set_permission(&location.object_id, request.permission),
            )
            .await?;

        self.cache.update_stream(
            &slug,
            StreamPatch {
                object_id: Some(location.object_id.clone()),
                library_id: Some(location.library_id.clone()),
                order: Some(order),
                title: Some(name),
                display_title: Some(display_title),
                description: request.description,
                recording: Some(request.live_config.recording_config()),
                playout: Some(request.live_config.playout_config()),
                ..StreamPatch::default()
            },
        );

        self.refresh_status(&location).await;

        info!(slug = %slug, object_id = %location.object_id, "Stream created");
        Ok(CreatedStream {
            object_id: location.object_id,
            slug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Retention, SiteListing, StreamStatus, SITE_STREAMS_PATH};
    use crate::test_helpers::{test_library_id, StreamFixture, TestHarness};

    fn request(name: &str) -> CreateStreamRequest {
        CreateStreamRequest {
            name: name.to_string(),
            display_title: None,
            description: None,
            library_id: test_library_id("libX"),
            permission: "editable".parse().unwrap(),
            live_config: LiveConfigFields {
                encryption: "clear".to_string(),
                retention: Retention::parse("86400").unwrap(),
                ..LiveConfigFields::default()
            },
        }
    }

    #[tokio::test]
    async fn test_create_stream() {
        let harness = TestHarness::new();

        let created = harness.lifecycle.create(request("Test Stream")).await.unwrap();

        assert!(!created.object_id.as_str().is_empty());
        assert_eq!(created.slug, "test-stream");

        let cached = harness.cache.get("test-stream").unwrap();
        assert_eq!(cached.title, "Test Stream");
        assert!(cached.status.is_some());
        assert_eq!(cached.object_id.as_ref(), Some(&created.object_id));

        let object = harness.fabric.object(&created.object_id).unwrap();
        assert_eq!(object.library_id, test_library_id("libX"));
        assert_eq!(object.permission, Some(ObjectPermission::Editable));
        assert!(object.groups.contains("0xgroup"));

        let config = harness.fabric.metadata(&created.object_id, LIVE_CONFIG_PATH).unwrap();
        assert_eq!(config["drm"], "clear");
        assert_eq!(config["part_ttl"], 86_400);

        let listing: SiteListing =
            serde_json::from_value(harness.fabric.site_metadata(SITE_STREAMS_PATH).unwrap()).unwrap();
        assert_eq!(listing["test-stream"].object_id.as_ref(), Some(&created.object_id));
        assert!(listing["test-stream"].link.contains("/meta/public/asset_metadata"));
    }

    #[tokio::test]
    async fn test_create_tolerates_best_effort_failures() {
        let harness = TestHarness::new();
        harness.fabric.fail("add_group_permission");
        harness.fabric.fail("set_permission");
        harness.fabric.fail("stream_status");

        let created = harness.lifecycle.create(request("Backup Feed")).await.unwrap();

        let cached = harness.cache.get(&created.slug).unwrap();
        assert_eq!(cached.title, "Backup Feed");
        assert!(cached.status.is_none());
    }

    #[tokio::test]
    async fn test_create_fails_before_site_link_when_finalize_fails() {
        let harness = TestHarness::new();
        harness.fabric.fail("finalize_content_object");

        assert!(harness.lifecycle.create(request("Test Stream")).await.is_err());
        assert!(harness.cache.get("test-stream").is_none());
        assert!(harness.fabric.site_metadata(SITE_STREAMS_PATH).is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_name_without_remote_calls() {
        let harness = TestHarness::new();

        let err = harness.lifecycle.create(request("  ")).await.unwrap_err();

        assert!(err.is_precondition());
        assert_eq!(harness.fabric.call_count("create_content_object"), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_existing_slug() {
        let harness = TestHarness::new();
        StreamFixture::new("test-stream")
            .with_status(StreamStatus::Inactive)
            .install(&harness.fabric, &harness.cache);

        let err = harness.lifecycle.create(request("Test Stream")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}

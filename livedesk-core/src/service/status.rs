//! Single-stream status checks

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::cache::StreamCache;
use crate::error::{FailurePolicy, Result};
use crate::fabric::{FabricClient, StatusResponse};
use crate::models::{FrameSnapshot, ObjectId, StreamPatch, StreamStatus};

/// Outcome of one remote status check, not yet applied to the cache
#[derive(Debug, Clone)]
pub struct StatusCheck {
    pub response: StatusResponse,
    pub patch: StreamPatch,
}

impl StatusCheck {
    #[must_use]
    pub const fn state(&self) -> StreamStatus {
        self.response.state
    }
}

/// Asks the remote status oracle about one stream
#[derive(Clone)]
pub struct StatusService {
    fabric: Arc<dyn FabricClient>,
    cache: StreamCache,
}

impl StatusService {
    #[must_use]
    pub fn new(fabric: Arc<dyn FabricClient>, cache: StreamCache) -> Self {
        Self { fabric, cache }
    }

    /// Fetch status plus the derived fields that travel with it.
    ///
    /// The status call is fatal; the embed URL is best-effort and left out
    /// of the patch when it fails.
    pub async fn fetch(&self, object_id: &ObjectId) -> Result<StatusCheck> {
        let response = self.fabric.stream_status(object_id).await?;
        let embed_url = FailurePolicy::BestEffort
            .run("embed_url", self.fabric.embed_url(object_id))
            .await?;

        let frame = response.frame_url.clone().map(|url| FrameSnapshot {
            url,
            captured_at: Utc::now(),
        });

        let patch = StreamPatch {
            status: Some(response.state),
            quality: response.quality,
            warnings: Some(response.warnings.clone()),
            embed_url,
            frame,
            ..StreamPatch::default()
        };

        Ok(StatusCheck { response, patch })
    }

    /// Fetch and apply in one cache update
    pub async fn refresh(&self, slug: &str, object_id: &ObjectId) -> Result<StatusCheck> {
        let check = self.fetch(object_id).await?;
        debug!(slug = %slug, status = %check.state(), "Stream status refreshed");
        self.cache.update_stream(slug, check.patch.clone());
        Ok(check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StreamQuality;
    use crate::test_helpers::{test_object_id, FakeFabric};

    fn service(fabric: &Arc<FakeFabric>) -> (StatusService, StreamCache) {
        let cache = StreamCache::new();
        (StatusService::new(fabric.clone(), cache.clone()), cache)
    }

    #[tokio::test]
    async fn test_refresh_applies_derived_fields_together() {
        let fabric = Arc::new(FakeFabric::new());
        let id = test_object_id("iq__abc");
        fabric.set_status_response(
            &id,
            StatusResponse {
                state: StreamStatus::Running,
                quality: Some(StreamQuality::Degraded),
                warnings: vec!["audio drift".into()],
                edge_write_token: Some("tqw__edge".into()),
                frame_url: Some("https://frames.example/1.jpg".into()),
            },
        );
        let (service, cache) = service(&fabric);
        let mut events = cache.subscribe();

        service.refresh("foo", &id).await.unwrap();

        let stream = cache.get("foo").unwrap();
        assert_eq!(stream.status, Some(StreamStatus::Running));
        assert_eq!(stream.quality, Some(StreamQuality::Degraded));
        assert_eq!(stream.warnings, vec!["audio drift".to_string()]);
        assert!(stream.embed_url.unwrap().contains("iq__abc"));
        assert_eq!(stream.frame.unwrap().url, "https://frames.example/1.jpg");
        // One update carries everything
        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_embed_url_failure_is_best_effort() {
        let fabric = Arc::new(FakeFabric::new());
        let id = test_object_id("iq__abc");
        fabric.set_status(&id, StreamStatus::Inactive);
        fabric.fail("embed_url");
        let (service, cache) = service(&fabric);

        let check = service.refresh("foo", &id).await.unwrap();
        assert_eq!(check.state(), StreamStatus::Inactive);
        assert!(cache.get("foo").unwrap().embed_url.is_none());
    }

    #[tokio::test]
    async fn test_status_failure_leaves_cache_untouched() {
        let fabric = Arc::new(FakeFabric::new());
        let id = test_object_id("iq__abc");
        fabric.fail_status_for(&id);
        let (service, cache) = service(&fabric);

        assert!(service.refresh("foo", &id).await.is_err());
        assert!(cache.get("foo").is_none());
    }
}

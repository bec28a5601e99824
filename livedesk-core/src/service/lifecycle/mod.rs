//! Stream lifecycle orchestration
//!
//! Every operation is a strictly ordered sequence of fabric calls. Each step
//! is either fatal (aborts the operation) or best-effort (logged and
//! skipped), declared with [`FailurePolicy`]. Transitions are never asserted
//! locally; the cache only receives states that a remote call reported.

mod archive;
mod configure;
mod control;
mod create;
mod delete;
mod ladder;
mod load;
mod playout;
mod site;

pub use archive::{CopyOutcome, CopyToVodOptions, RecordingCopies};
pub use configure::{sync_audio_tracks, ConfigureOptions};
pub use create::{CreateStreamRequest, CreatedStream};
pub use playout::{playout_formats, PlayoutOutcome, PlayoutSettings, WatermarkChange};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use super::poller::StatusPoller;
use super::status::StatusService;
use crate::cache::StreamCache;
use crate::error::{Error, FailurePolicy, Result};
use crate::fabric::FabricClient;
use crate::models::{LibraryId, ObjectId, WriteToken};

/// Default bound for fan-out over streams or libraries
pub const DEFAULT_FAN_OUT: usize = 10;

/// The tenant site object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRef {
    pub library_id: LibraryId,
    pub object_id: ObjectId,
}

/// Where a cached stream lives in the fabric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLocation {
    pub slug: String,
    pub object_id: ObjectId,
    pub library_id: LibraryId,
}

pub struct LifecycleService {
    fabric: Arc<dyn FabricClient>,
    cache: StreamCache,
    status: StatusService,
    poller: Arc<StatusPoller>,
    site: SiteRef,
    access_group: Option<String>,
    stream_content_type: Option<String>,
    fan_out: usize,
}

impl LifecycleService {
    #[must_use]
    pub fn new(
        fabric: Arc<dyn FabricClient>,
        cache: StreamCache,
        status: StatusService,
        poller: Arc<StatusPoller>,
        site: SiteRef,
    ) -> Self {
        Self {
            fabric,
            cache,
            status,
            poller,
            site,
            access_group: None,
            stream_content_type: None,
            fan_out: DEFAULT_FAN_OUT,
        }
    }

    /// Access group granted manage rights on every object this service creates
    #[must_use]
    pub fn with_access_group(mut self, group: Option<String>) -> Self {
        self.access_group = group.filter(|g| !g.is_empty());
        self
    }

    #[must_use]
    pub fn with_stream_content_type(mut self, content_type: Option<String>) -> Self {
        self.stream_content_type = content_type.filter(|t| !t.is_empty());
        self
    }

    #[must_use]
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }

    #[must_use]
    pub const fn cache(&self) -> &StreamCache {
        &self.cache
    }

    #[must_use]
    pub const fn site(&self) -> &SiteRef {
        &self.site
    }

    /// Resolve a cached stream to its object and library.
    ///
    /// The library id is looked up remotely when the cache does not have it.
    pub async fn locate(&self, slug: &str) -> Result<StreamLocation> {
        let stream = self
            .cache
            .get(slug)
            .ok_or_else(|| Error::StreamNotFound(slug.to_string()))?;
        let object_id = stream
            .object_id
            .ok_or_else(|| Error::StreamNotFound(format!("{slug} has no object id")))?;
        let library_id = match stream.library_id {
            Some(id) => id,
            None => self.fabric.content_object_library_id(&object_id).await?,
        };
        Ok(StreamLocation {
            slug: slug.to_string(),
            object_id,
            library_id,
        })
    }

    /// Read and decode one metadata subtree. Missing decodes as default.
    async fn read_metadata<T: DeserializeOwned + Default>(
        &self,
        library_id: &LibraryId,
        object_id: &ObjectId,
        path: &str,
    ) -> Result<T> {
        let value = self
            .fabric
            .content_object_metadata(library_id, object_id, path, false)
            .await?;
        match value {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    async fn edit(&self, location: &StreamLocation) -> Result<WriteToken> {
        Ok(self
            .fabric
            .edit_content_object(&location.library_id, &location.object_id)
            .await?)
    }

    async fn finalize(
        &self,
        location: &StreamLocation,
        write_token: &WriteToken,
        message: &str,
    ) -> Result<String> {
        let finalized = self
            .fabric
            .finalize_content_object(
                &location.library_id,
                &location.object_id,
                write_token,
                message,
                true,
            )
            .await?;
        Ok(finalized.hash)
    }

    /// Refresh cached status after a mutation; failure only logs
    async fn refresh_status(&self, location: &StreamLocation) {
        let _ = FailurePolicy::BestEffort
            .run(
                "refresh_status",
                self.status.refresh(&location.slug, &location.object_id),
            )
            .await;
    }
}

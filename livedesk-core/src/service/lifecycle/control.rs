//! Start, stop, reset, deactivate and check

use tracing::{debug, info};

use super::{LifecycleService, StreamLocation};
use crate::error::{Error, Result};
use crate::fabric::{ControlResponse, LroOperation};
use crate::models::{StreamPatch, StreamStatus};

impl LifecycleService {
    /// Ask the status oracle and cache the answer
    pub async fn check(&self, slug: &str) -> Result<StreamStatus> {
        let location = self.locate(slug).await?;
        let check = self.status.refresh(slug, &location.object_id).await?;
        Ok(check.state())
    }

    /// Start recording and the playout LRO.
    ///
    /// Unready streams fail before any mutation. Streams already starting,
    /// running or stalled are left alone. An edge recording session is only
    /// opened when none is held.
    pub async fn start(&self, slug: &str) -> Result<StreamStatus> {
        let location = self.locate(slug).await?;
        let check = self.status.refresh(slug, &location.object_id).await?;
        let current = check.state();

        if current.is_unready() {
            return Err(Error::NotReady {
                slug: slug.to_string(),
                status: current,
            });
        }
        if current.is_live() {
            debug!(slug = %slug, status = %current, "Stream already live, start is a no-op");
            return Ok(current);
        }

        if check.response.has_edge_write_token() {
            debug!(slug = %slug, "Edge write token present, reusing recording session");
        } else if let Some(response) = self.fabric.stream_start_recording(&location.object_id).await? {
            response.into_state("stream_start_recording")?;
        }

        let response = self.fabric.stream_lro(&location.object_id, LroOperation::Start).await?;
        let state = self.apply_control(&location, response, "stream_lro_start")?;
        info!(slug = %slug, status = ?state, "Stream start requested");
        Ok(state.unwrap_or(current))
    }

    pub async fn stop(&self, slug: &str) -> Result<Option<StreamStatus>> {
        self.lro(slug, LroOperation::Stop).await
    }

    pub async fn reset(&self, slug: &str) -> Result<Option<StreamStatus>> {
        self.lro(slug, LroOperation::Reset).await
    }

    /// Close the edge recording session.
    ///
    /// An empty response means nothing was open and leaves the cache alone.
    pub async fn deactivate(&self, slug: &str) -> Result<Option<StreamStatus>> {
        let location = self.locate(slug).await?;
        let Some(response) = self.fabric.stream_stop_recording(&location.object_id).await? else {
            debug!(slug = %slug, "No recording session to deactivate");
            return Ok(None);
        };

        let state = self.apply_control(&location, response, "stream_stop_recording")?;
        if state.is_none() {
            self.refresh_status(&location).await;
        }
        info!(slug = %slug, status = ?state, "Stream deactivated");
        Ok(state)
    }

    async fn lro(&self, slug: &str, op: LroOperation) -> Result<Option<StreamStatus>> {
        let location = self.locate(slug).await?;
        let response = self.fabric.stream_lro(&location.object_id, op).await?;
        let state = self.apply_control(&location, response, op.as_str())?;
        info!(slug = %slug, op = op.as_str(), status = ?state, "Stream LRO control applied");
        Ok(state)
    }

    /// Surface an in-band error, otherwise echo the reported state
    fn apply_control(
        &self,
        location: &StreamLocation,
        response: ControlResponse,
        method: &str,
    ) -> Result<Option<StreamStatus>> {
        let state = response.into_state(method)?;
        if let Some(state) = state {
            self.cache.update_stream(&location.slug, StreamPatch::status(state));
        }
        Ok(state)
    }
}

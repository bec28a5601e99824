// Fabric Client Trait
//
// The single seam between the orchestration core and the media fabric

use async_trait::async_trait;
use serde_json::Value;

use super::error::Result;
use super::types::{
    AccessGroup, ControlResponse, CopyToVodRequest, CreatedObject, FinalizedObject, InitOptions,
    LinkSpec, LroOperation, ObjectPermission, ProbeResult, StatusResponse, StreamSettings,
};
use crate::models::{LibraryId, ObjectId, Watermark, WatermarkKind, WriteToken};

/// Remote fabric client
///
/// Every method is a suspension point with its own latency and failure modes.
/// Implementations must report response-level `error` payloads as
/// [`super::FabricError::Remote`] rather than as success.
#[async_trait]
pub trait FabricClient: Send + Sync {
    // ========== Object Lifecycle ==========

    /// Create a content object and open a write token on it
    async fn create_content_object(
        &self,
        library_id: &LibraryId,
        content_type: Option<&str>,
    ) -> Result<CreatedObject>;

    /// Open a write token on an existing object
    async fn edit_content_object(
        &self,
        library_id: &LibraryId,
        object_id: &ObjectId,
    ) -> Result<WriteToken>;

    /// Commit a write token, returning the new version hash
    async fn finalize_content_object(
        &self,
        library_id: &LibraryId,
        object_id: &ObjectId,
        write_token: &WriteToken,
        commit_message: &str,
        await_commit: bool,
    ) -> Result<FinalizedObject>;

    async fn delete_content_object(&self, library_id: &LibraryId, object_id: &ObjectId)
        -> Result<()>;

    async fn content_object_library_id(&self, object_id: &ObjectId) -> Result<LibraryId>;

    async fn latest_version_hash(&self, object_id: &ObjectId) -> Result<String>;

    /// Object a version hash belongs to
    async fn object_id_for_hash(&self, version_hash: &str) -> Result<ObjectId>;

    // ========== Metadata ==========

    /// Read a metadata subtree. `Ok(None)` when the path does not exist.
    async fn content_object_metadata(
        &self,
        library_id: &LibraryId,
        object_id: &ObjectId,
        path: &str,
        resolve_links: bool,
    ) -> Result<Option<Value>>;

    async fn merge_metadata(
        &self,
        library_id: &LibraryId,
        object_id: &ObjectId,
        write_token: &WriteToken,
        path: &str,
        value: Value,
    ) -> Result<()>;

    async fn replace_metadata(
        &self,
        library_id: &LibraryId,
        object_id: &ObjectId,
        write_token: &WriteToken,
        path: &str,
        value: Value,
    ) -> Result<()>;

    // ========== Permissions ==========

    async fn set_permission(&self, object_id: &ObjectId, permission: ObjectPermission)
        -> Result<()>;

    /// Grant an access group manage rights on an object
    async fn add_group_permission(&self, object_id: &ObjectId, group_address: &str) -> Result<()>;

    async fn remove_group_permission(&self, object_id: &ObjectId, group_address: &str)
        -> Result<()>;

    // ========== Stream Control ==========

    async fn stream_status(&self, object_id: &ObjectId) -> Result<StatusResponse>;

    /// Start, stop or reset the long-running recording operation
    async fn stream_lro(&self, object_id: &ObjectId, op: LroOperation) -> Result<ControlResponse>;

    /// Open an edge recording session. `Ok(None)` when nothing was started.
    async fn stream_start_recording(&self, object_id: &ObjectId)
        -> Result<Option<ControlResponse>>;

    /// Close the edge recording session. `Ok(None)` when none was open.
    async fn stream_stop_recording(&self, object_id: &ObjectId)
        -> Result<Option<ControlResponse>>;

    /// Write normalized settings and probe the source
    async fn stream_config(
        &self,
        object_id: &ObjectId,
        settings: &StreamSettings,
    ) -> Result<ProbeResult>;

    async fn stream_init(&self, object_id: &ObjectId, options: &InitOptions) -> Result<()>;

    async fn stream_add_watermark(
        &self,
        object_id: &ObjectId,
        write_token: &WriteToken,
        watermark: &Watermark,
    ) -> Result<()>;

    async fn stream_remove_watermark(
        &self,
        object_id: &ObjectId,
        write_token: &WriteToken,
        kinds: &[WatermarkKind],
    ) -> Result<()>;

    /// Copy a recorded range into a VoD object. `Ok(None)` when the fabric
    /// produced nothing to copy.
    async fn stream_copy_to_vod(&self, request: &CopyToVodRequest) -> Result<Option<Value>>;

    async fn create_links(
        &self,
        library_id: &LibraryId,
        object_id: &ObjectId,
        write_token: &WriteToken,
        links: &[LinkSpec],
    ) -> Result<()>;

    async fn embed_url(&self, object_id: &ObjectId) -> Result<String>;

    // ========== Directory ==========

    async fn content_libraries(&self) -> Result<Vec<LibraryId>>;

    /// Display name of a library, from its public metadata
    async fn library_name(&self, library_id: &LibraryId) -> Result<Option<String>>;

    async fn access_groups(&self) -> Result<Vec<AccessGroup>>;

    async fn drm_schemes(&self) -> Result<Vec<String>>;
}

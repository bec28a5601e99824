//! Test helpers and fixtures for livedesk-core tests
//!
//! [`FakeFabric`] is an in-memory [`FabricClient`] with per-method call
//! recording and failure injection. Metadata writes apply directly to the
//! object tree; finalize bumps the version hash.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::cache::StreamCache;
use crate::fabric::{
    AccessGroup, ControlResponse, CopyToVodRequest, CreatedObject, FabricClient, FabricError,
    FinalizedObject, InitOptions, LinkSpec, LroOperation, ObjectPermission, ProbeResult, Result,
    StatusResponse, StreamSettings,
};
use crate::models::{
    LibraryId, ObjectId, SiteEntry, Stream, StreamStatus, Watermark, WatermarkKind, WriteToken,
    SITE_STREAMS_PATH,
};
use crate::service::{LifecycleService, SiteRef, StatusPoller, StatusService};

pub const SITE_LIBRARY: &str = "ilib_site";
pub const SITE_OBJECT: &str = "iq__site";

pub fn test_object_id(id: &str) -> ObjectId {
    ObjectId::from_string(id.to_string())
}

pub fn test_library_id(id: &str) -> LibraryId {
    LibraryId::from_string(id.to_string())
}

pub fn random_object_id() -> ObjectId {
    ObjectId(format!("iq__{}", nanoid::nanoid!(12)))
}

// ============================================================================
// Metadata tree helpers
// ============================================================================

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(root, |node, key| node.get(key))
}

fn node_mut<'a>(root: &'a mut Value, path: &str) -> &'a mut Value {
    segments(path).fold(root, |node, key| {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        match node {
            Value::Object(map) => map.entry(key.to_string()).or_insert(Value::Null),
            _ => unreachable!("node was just made an object"),
        }
    })
}

fn merge_into(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge_into(target.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}

// ============================================================================
// FakeFabric
// ============================================================================

#[derive(Debug, Clone)]
pub struct FakeObject {
    pub library_id: LibraryId,
    pub metadata: Value,
    pub version: u32,
    pub permission: Option<ObjectPermission>,
    pub groups: HashSet<String>,
}

impl FakeObject {
    pub fn hash(&self, object_id: &ObjectId) -> String {
        format!("hq__{}_v{}", object_id.as_str().trim_start_matches("iq__"), self.version)
    }
}

#[derive(Default)]
struct FakeState {
    objects: HashMap<ObjectId, FakeObject>,
    tokens: HashMap<String, ObjectId>,
    statuses: HashMap<ObjectId, StatusResponse>,
    probes: HashMap<ObjectId, ProbeResult>,
    failing_status: HashSet<ObjectId>,
    failing: HashSet<&'static str>,
    remote_errors: HashSet<&'static str>,
    copy_returns_empty: bool,
    calls: Vec<(&'static str, String)>,
    copy_requests: Vec<CopyToVodRequest>,
    stream_settings: Vec<StreamSettings>,
    libraries: Vec<(LibraryId, Option<String>)>,
    next_id: u32,
}

/// In-memory fabric double
#[derive(Default)]
pub struct FakeFabric {
    state: Mutex<FakeState>,
    status_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeFabric {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.insert_object(&test_object_id(SITE_OBJECT), &test_library_id(SITE_LIBRARY), json!({}));
        fake
    }

    pub fn insert_object(&self, object_id: &ObjectId, library_id: &LibraryId, metadata: Value) {
        self.state.lock().objects.insert(
            object_id.clone(),
            FakeObject {
                library_id: library_id.clone(),
                metadata,
                version: 1,
                permission: None,
                groups: HashSet::new(),
            },
        );
    }

    /// Register a stream object and link it from the site listing
    pub fn insert_stream(&self, slug: &str, object_id: &ObjectId, library_id: &LibraryId, metadata: Value) {
        self.insert_object(object_id, library_id, metadata);
        let mut state = self.state.lock();
        let site = state
            .objects
            .get_mut(&test_object_id(SITE_OBJECT))
            .expect("site object exists");
        let listing = node_mut(&mut site.metadata, SITE_STREAMS_PATH);
        let order = listing.as_object().map_or(0, |m| m.len() as u32);
        let entry = SiteEntry::new(order, object_id.clone(), Some(library_id.clone()), "hq__seed");
        merge_into(listing, json!({ slug: serde_json::to_value(entry).expect("entry serializes") }));
    }

    pub fn object(&self, object_id: &ObjectId) -> Option<FakeObject> {
        self.state.lock().objects.get(object_id).cloned()
    }

    pub fn metadata(&self, object_id: &ObjectId, path: &str) -> Option<Value> {
        self.state
            .lock()
            .objects
            .get(object_id)
            .and_then(|o| get_path(&o.metadata, path).cloned())
    }

    pub fn site_metadata(&self, path: &str) -> Option<Value> {
        self.metadata(&test_object_id(SITE_OBJECT), path)
    }

    /// Overwrite a site metadata subtree without going through a write token
    pub fn set_site_metadata(&self, path: &str, value: Value) {
        if let Some(site) = self.state.lock().objects.get_mut(&test_object_id(SITE_OBJECT)) {
            *node_mut(&mut site.metadata, path) = value;
        }
    }

    pub fn set_status(&self, object_id: &ObjectId, state: StreamStatus) {
        self.set_status_response(
            object_id,
            StatusResponse {
                state,
                quality: None,
                warnings: Vec::new(),
                edge_write_token: None,
                frame_url: None,
            },
        );
    }

    pub fn set_status_response(&self, object_id: &ObjectId, response: StatusResponse) {
        self.state.lock().statuses.insert(object_id.clone(), response);
    }

    pub fn set_probe(&self, object_id: &ObjectId, probe: ProbeResult) {
        self.state.lock().probes.insert(object_id.clone(), probe);
    }

    pub fn set_libraries(&self, libraries: Vec<(LibraryId, Option<String>)>) {
        self.state.lock().libraries = libraries;
    }

    /// Make status checks for one object fail
    pub fn fail_status_for(&self, object_id: &ObjectId) {
        self.state.lock().failing_status.insert(object_id.clone());
    }

    /// Make every call to `method` fail at the transport level
    pub fn fail(&self, method: &'static str) {
        self.state.lock().failing.insert(method);
    }

    /// Make control `method` succeed with an `error` payload
    pub fn remote_error(&self, method: &'static str) {
        self.state.lock().remote_errors.insert(method);
    }

    pub fn copy_returns_empty(&self) {
        self.state.lock().copy_returns_empty = true;
    }

    /// Hold every status check until the semaphore hands out a permit
    pub fn gate_status(&self, gate: Arc<Semaphore>) {
        *self.status_gate.lock() = Some(gate);
    }

    pub fn calls(&self, method: &str) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, detail)| detail.clone())
            .collect()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls(method).len()
    }

    pub fn copy_requests(&self) -> Vec<CopyToVodRequest> {
        self.state.lock().copy_requests.clone()
    }

    pub fn stream_settings(&self) -> Vec<StreamSettings> {
        self.state.lock().stream_settings.clone()
    }

    fn record(&self, method: &'static str, detail: impl Into<String>) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push((method, detail.into()));
        if state.failing.contains(method) {
            return Err(FabricError::Rpc(format!("{method} failed")));
        }
        Ok(())
    }

    fn control(&self, method: &'static str, state: StreamStatus) -> ControlResponse {
        let error = self
            .state
            .lock()
            .remote_errors
            .contains(method)
            .then(|| json!({ "message": format!("{method} rejected") }));
        ControlResponse {
            state: Some(state),
            error,
        }
    }

    fn with_object<T>(
        &self,
        object_id: &ObjectId,
        f: impl FnOnce(&mut FakeObject) -> T,
    ) -> Result<T> {
        let mut state = self.state.lock();
        state
            .objects
            .get_mut(object_id)
            .map(f)
            .ok_or_else(|| FabricError::NotFound(object_id.to_string()))
    }

    fn token_object(&self, write_token: &WriteToken) -> Result<ObjectId> {
        self.state
            .lock()
            .tokens
            .get(write_token.as_str())
            .cloned()
            .ok_or_else(|| FabricError::NotFound(format!("write token {write_token}")))
    }

    fn open_token(&self, object_id: &ObjectId) -> WriteToken {
        let mut state = self.state.lock();
        state.next_id += 1;
        let token = format!("tqw__{}", state.next_id);
        state.tokens.insert(token.clone(), object_id.clone());
        WriteToken(token)
    }

    fn set_playout_state(&self, object_id: &ObjectId, state: StreamStatus) {
        let mut guard = self.state.lock();
        let response = guard.statuses.entry(object_id.clone()).or_insert(StatusResponse {
            state,
            quality: None,
            warnings: Vec::new(),
            edge_write_token: None,
            frame_url: None,
        });
        response.state = state;
    }
}

#[async_trait]
impl FabricClient for FakeFabric {
    async fn create_content_object(
        &self,
        library_id: &LibraryId,
        content_type: Option<&str>,
    ) -> Result<CreatedObject> {
        self.record("create_content_object", format!("{library_id} {content_type:?}"))?;
        let object_id = {
            let mut state = self.state.lock();
            state.next_id += 1;
            ObjectId(format!("iq__new{}", state.next_id))
        };
        self.insert_object(&object_id, library_id, json!({}));
        let write_token = self.open_token(&object_id);
        Ok(CreatedObject {
            object_id,
            write_token,
        })
    }

    async fn edit_content_object(
        &self,
        _library_id: &LibraryId,
        object_id: &ObjectId,
    ) -> Result<WriteToken> {
        self.record("edit_content_object", object_id.to_string())?;
        self.with_object(object_id, |_| ())?;
        Ok(self.open_token(object_id))
    }

    async fn finalize_content_object(
        &self,
        _library_id: &LibraryId,
        object_id: &ObjectId,
        write_token: &WriteToken,
        commit_message: &str,
        _await_commit: bool,
    ) -> Result<FinalizedObject> {
        self.record("finalize_content_object", format!("{object_id} {commit_message}"))?;
        self.token_object(write_token)?;
        self.state.lock().tokens.remove(write_token.as_str());
        let hash = self.with_object(object_id, |o| {
            o.version += 1;
            o.hash(object_id)
        })?;
        Ok(FinalizedObject { hash })
    }

    async fn delete_content_object(&self, _library_id: &LibraryId, object_id: &ObjectId) -> Result<()> {
        self.record("delete_content_object", object_id.to_string())?;
        self.state
            .lock()
            .objects
            .remove(object_id)
            .map(|_| ())
            .ok_or_else(|| FabricError::NotFound(object_id.to_string()))
    }

    async fn content_object_library_id(&self, object_id: &ObjectId) -> Result<LibraryId> {
        self.record("content_object_library_id", object_id.to_string())?;
        self.with_object(object_id, |o| o.library_id.clone())
    }

    async fn latest_version_hash(&self, object_id: &ObjectId) -> Result<String> {
        self.record("latest_version_hash", object_id.to_string())?;
        self.with_object(object_id, |o| o.hash(object_id))
    }

    async fn object_id_for_hash(&self, version_hash: &str) -> Result<ObjectId> {
        self.record("object_id_for_hash", version_hash)?;
        let body = version_hash
            .strip_prefix("hq__")
            .ok_or_else(|| FabricError::NotFound(version_hash.to_string()))?;
        let body = match body.rsplit_once("_v") {
            Some((id, version)) if version.parse::<u32>().is_ok() => id,
            _ => body,
        };
        let object_id = ObjectId(format!("iq__{body}"));
        self.with_object(&object_id, |_| object_id.clone())
    }

    async fn content_object_metadata(
        &self,
        _library_id: &LibraryId,
        object_id: &ObjectId,
        path: &str,
        _resolve_links: bool,
    ) -> Result<Option<Value>> {
        self.record("content_object_metadata", format!("{object_id} {path}"))?;
        self.with_object(object_id, |o| get_path(&o.metadata, path).cloned())
    }

    async fn merge_metadata(
        &self,
        _library_id: &LibraryId,
        object_id: &ObjectId,
        write_token: &WriteToken,
        path: &str,
        value: Value,
    ) -> Result<()> {
        self.record("merge_metadata", format!("{object_id} {path}"))?;
        self.token_object(write_token)?;
        self.with_object(object_id, |o| merge_into(node_mut(&mut o.metadata, path), value))
    }

    async fn replace_metadata(
        &self,
        _library_id: &LibraryId,
        object_id: &ObjectId,
        write_token: &WriteToken,
        path: &str,
        value: Value,
    ) -> Result<()> {
        self.record("replace_metadata", format!("{object_id} {path}"))?;
        self.token_object(write_token)?;
        self.with_object(object_id, |o| *node_mut(&mut o.metadata, path) = value)
    }

    async fn set_permission(&self, object_id: &ObjectId, permission: ObjectPermission) -> Result<()> {
        self.record("set_permission", format!("{object_id} {permission}"))?;
        self.with_object(object_id, |o| o.permission = Some(permission))
    }

    async fn add_group_permission(&self, object_id: &ObjectId, group_address: &str) -> Result<()> {
        self.record("add_group_permission", format!("{object_id} {group_address}"))?;
        self.with_object(object_id, |o| {
            o.groups.insert(group_address.to_string());
        })
    }

    async fn remove_group_permission(&self, object_id: &ObjectId, group_address: &str) -> Result<()> {
        self.record("remove_group_permission", format!("{object_id} {group_address}"))?;
        self.with_object(object_id, |o| {
            o.groups.remove(group_address);
        })
    }

    async fn stream_status(&self, object_id: &ObjectId) -> Result<StatusResponse> {
        self.record("stream_status", object_id.to_string())?;
        let gate = self.status_gate.lock().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        let state = self.state.lock();
        if state.failing_status.contains(object_id) {
            return Err(FabricError::Timeout(format!("status of {object_id}")));
        }
        Ok(state.statuses.get(object_id).cloned().unwrap_or(StatusResponse {
            state: StreamStatus::Uninitialized,
            quality: None,
            warnings: Vec::new(),
            edge_write_token: None,
            frame_url: None,
        }))
    }

    async fn stream_lro(&self, object_id: &ObjectId, op: LroOperation) -> Result<ControlResponse> {
        self.record("stream_lro", format!("{object_id} {}", op.as_str()))?;
        let (method, state) = match op {
            LroOperation::Start => ("stream_lro_start", StreamStatus::Starting),
            LroOperation::Stop => ("stream_lro_stop", StreamStatus::Stopped),
            LroOperation::Reset => ("stream_lro_reset", StreamStatus::Starting),
        };
        let response = self.control(method, state);
        if response.error.is_none() {
            self.set_playout_state(object_id, state);
        }
        Ok(response)
    }

    async fn stream_start_recording(&self, object_id: &ObjectId) -> Result<Option<ControlResponse>> {
        self.record("stream_start_recording", object_id.to_string())?;
        let mut state = self.state.lock();
        let entry = state.statuses.entry(object_id.clone()).or_insert(StatusResponse {
            state: StreamStatus::Inactive,
            quality: None,
            warnings: Vec::new(),
            edge_write_token: None,
            frame_url: None,
        });
        entry.edge_write_token = Some(format!("tqw__edge_{object_id}"));
        Ok(Some(ControlResponse {
            state: Some(StreamStatus::Stopped),
            error: None,
        }))
    }

    async fn stream_stop_recording(&self, object_id: &ObjectId) -> Result<Option<ControlResponse>> {
        self.record("stream_stop_recording", object_id.to_string())?;
        let mut state = self.state.lock();
        let Some(entry) = state.statuses.get_mut(object_id) else {
            return Ok(None);
        };
        if entry.edge_write_token.take().is_none() {
            return Ok(None);
        }
        entry.state = StreamStatus::Inactive;
        Ok(Some(ControlResponse {
            state: Some(StreamStatus::Inactive),
            error: None,
        }))
    }

    async fn stream_config(&self, object_id: &ObjectId, settings: &StreamSettings) -> Result<ProbeResult> {
        self.record("stream_config", object_id.to_string())?;
        let mut state = self.state.lock();
        state.stream_settings.push(settings.clone());
        Ok(state.probes.get(object_id).cloned().unwrap_or_default())
    }

    async fn stream_init(&self, object_id: &ObjectId, options: &InitOptions) -> Result<()> {
        self.record("stream_init", format!("{object_id} {:?}", options.drm))?;
        self.set_playout_state(object_id, StreamStatus::Inactive);
        Ok(())
    }

    async fn stream_add_watermark(
        &self,
        object_id: &ObjectId,
        write_token: &WriteToken,
        watermark: &Watermark,
    ) -> Result<()> {
        self.record("stream_add_watermark", format!("{object_id} {}", watermark.kind().metadata_key()))?;
        self.token_object(write_token)?;
        let body = watermark.body()?;
        let path = format!("live_recording/playout_config/{}", watermark.kind().metadata_key());
        self.with_object(object_id, |o| *node_mut(&mut o.metadata, &path) = body)
    }

    async fn stream_remove_watermark(
        &self,
        object_id: &ObjectId,
        write_token: &WriteToken,
        kinds: &[WatermarkKind],
    ) -> Result<()> {
        let keys: Vec<_> = kinds.iter().map(WatermarkKind::metadata_key).collect();
        self.record("stream_remove_watermark", format!("{object_id} {}", keys.join(",")))?;
        self.token_object(write_token)?;
        self.with_object(object_id, |o| {
            for key in keys {
                *node_mut(&mut o.metadata, &format!("live_recording/playout_config/{key}")) =
                    Value::Null;
            }
        })
    }

    async fn stream_copy_to_vod(&self, request: &CopyToVodRequest) -> Result<Option<Value>> {
        self.record("stream_copy_to_vod", request.object_id.to_string())?;
        let mut state = self.state.lock();
        state.copy_requests.push(request.clone());
        if state.copy_returns_empty {
            return Ok(None);
        }
        Ok(Some(json!({ "copy_id": request.target_object_id })))
    }

    async fn create_links(
        &self,
        _library_id: &LibraryId,
        object_id: &ObjectId,
        write_token: &WriteToken,
        links: &[LinkSpec],
    ) -> Result<()> {
        self.record("create_links", object_id.to_string())?;
        self.token_object(write_token)?;
        self.with_object(object_id, |o| {
            for link in links {
                *node_mut(&mut o.metadata, &link.path) = json!({ "/": format!("./{}/{}", link.kind, link.target) });
            }
        })
    }

    async fn embed_url(&self, object_id: &ObjectId) -> Result<String> {
        self.record("embed_url", object_id.to_string())?;
        Ok(format!("https://embed.example/?oid={object_id}&mt=lv"))
    }

    async fn content_libraries(&self) -> Result<Vec<LibraryId>> {
        self.record("content_libraries", "")?;
        Ok(self.state.lock().libraries.iter().map(|(id, _)| id.clone()).collect())
    }

    async fn library_name(&self, library_id: &LibraryId) -> Result<Option<String>> {
        self.record("library_name", library_id.to_string())?;
        Ok(self
            .state
            .lock()
            .libraries
            .iter()
            .find(|(id, _)| id == library_id)
            .and_then(|(_, name)| name.clone()))
    }

    async fn access_groups(&self) -> Result<Vec<AccessGroup>> {
        self.record("access_groups", "")?;
        Ok(vec![AccessGroup {
            address: "0xgroup".to_string(),
            name: Some("Operators".to_string()),
        }])
    }

    async fn drm_schemes(&self) -> Result<Vec<String>> {
        self.record("drm_schemes", "")?;
        Ok(vec!["clear".to_string(), "drm-public".to_string(), "drm-all".to_string()])
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Test fixture builder for a cached [`Stream`]
pub struct StreamFixture {
    slug: String,
    object_id: ObjectId,
    library_id: LibraryId,
    title: String,
    status: Option<StreamStatus>,
}

impl StreamFixture {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            object_id: random_object_id(),
            library_id: test_library_id("ilib_streams"),
            title: slug.to_string(),
            status: None,
        }
    }

    pub fn with_object_id(mut self, id: &str) -> Self {
        self.object_id = test_object_id(id);
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_status(mut self, status: StreamStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn object_id(&self) -> &ObjectId {
        &self.object_id
    }

    pub fn build(self) -> Stream {
        Stream {
            object_id: Some(self.object_id),
            library_id: Some(self.library_id),
            title: self.title,
            status: self.status,
            ..Stream::new(self.slug)
        }
    }

    /// Register the stream in both the fake fabric and the cache
    pub fn install(self, fabric: &FakeFabric, cache: &StreamCache) -> Stream {
        let stream = self.build();
        let object_id = stream.object_id.clone().expect("fixture has object id");
        let library_id = stream.library_id.clone().expect("fixture has library id");
        fabric.insert_stream(
            &stream.slug,
            &object_id,
            &library_id,
            json!({ "public": { "name": stream.title, "asset_metadata": { "title": stream.title } } }),
        );
        if let Some(status) = stream.status {
            fabric.set_status(&object_id, status);
        }
        cache.update_stream(&stream.slug, crate::models::StreamPatch {
            object_id: Some(object_id),
            library_id: Some(library_id),
            title: Some(stream.title.clone()),
            status: stream.status,
            ..Default::default()
        });
        stream
    }
}

/// Fully wired service stack over a [`FakeFabric`]
pub struct TestHarness {
    pub fabric: Arc<FakeFabric>,
    pub cache: StreamCache,
    pub poller: Arc<StatusPoller>,
    pub lifecycle: Arc<LifecycleService>,
}

impl TestHarness {
    pub fn new() -> Self {
        let fabric = Arc::new(FakeFabric::new());
        let client: Arc<dyn FabricClient> = fabric.clone();
        let cache = StreamCache::new();
        let status = StatusService::new(client.clone(), cache.clone());
        let poller = Arc::new(StatusPoller::new(status.clone(), cache.clone(), 15));
        let site = SiteRef {
            library_id: test_library_id(SITE_LIBRARY),
            object_id: test_object_id(SITE_OBJECT),
        };
        let lifecycle = Arc::new(
            LifecycleService::new(client, cache.clone(), status, poller.clone(), site)
                .with_access_group(Some("0xgroup".to_string())),
        );
        Self {
            fabric,
            cache,
            poller,
            lifecycle,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

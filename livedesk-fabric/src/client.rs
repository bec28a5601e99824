//! Bridge HTTP Client
//!
//! Every [`FabricClient`] call becomes one POST of a `{id, method, params}`
//! envelope. Idempotent reads are retried with backoff on transient
//! failures; mutations are sent exactly once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};
use livedesk_core::config::FabricConfig;
use livedesk_core::fabric::{
    AccessGroup, ControlResponse, CopyToVodRequest, CreatedObject, FabricClient, FabricError,
    FinalizedObject, InitOptions, LinkSpec, LroOperation, ObjectPermission, ProbeResult, Result,
    StatusResponse, StreamSettings,
};
use livedesk_core::models::{LibraryId, ObjectId, Watermark, WatermarkKind, WriteToken};
use livedesk_core::resilience::retry::is_transient_fabric_error;
use livedesk_core::resilience::timeout::TimeoutConfig;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use super::error::{check_response, json_with_limit, BridgeError};

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<Value>,
}

/// Fabric bridge client
pub struct BridgeClient {
    endpoint: Url,
    client: Client,
    headers: HeaderMap,
    display_app_url: Option<String>,
    environment: String,
    timeouts: TimeoutConfig,
    read_attempts: usize,
    next_id: AtomicU64,
}

impl BridgeClient {
    pub fn new(config: &FabricConfig) -> std::result::Result<Self, BridgeError> {
        let endpoint = Url::parse(&config.bridge_url)
            .map_err(|e| BridgeError::InvalidConfig(format!("bridge_url: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = config.auth_token.as_deref().filter(|t| !t.is_empty()) {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| BridgeError::InvalidConfig(format!("http client: {e}")))?;

        Ok(Self {
            endpoint,
            client,
            headers,
            display_app_url: config.display_app_url.clone(),
            environment: config.environment.clone(),
            timeouts: TimeoutConfig::new().with_request_timeout(config.request_timeout()),
            read_attempts: config.read_retries.max(1),
            next_id: AtomicU64::new(1),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Status checks fail fast; finalize may wait for the commit to publish
    fn timeout_for(&self, method: &str) -> Duration {
        match method {
            "stream_status" => self.timeouts.status,
            "finalize_content_object" => self.timeouts.finalize.max(self.timeouts.request),
            _ => self.timeouts.request,
        }
    }

    /// Send one envelope. An `error` member is a [`BridgeError::Remote`].
    async fn call(&self, method: &str, params: &Value) -> std::result::Result<Value, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(id, method, "Bridge call");

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .timeout(self.timeout_for(method))
            .json(&Request { id, method, params })
            .send()
            .await?;
        let envelope: Response = json_with_limit(check_response(response)?).await?;

        match envelope.error {
            Some(payload) if !payload.is_null() => Err(match FabricError::remote(method, &payload) {
                FabricError::Remote { method, message } => BridgeError::Remote { method, message },
                other => BridgeError::Parse(other.to_string()),
            }),
            _ => Ok(envelope.result),
        }
    }

    /// Mutation: sent once
    async fn send(&self, method: &str, params: Value) -> Result<Value> {
        self.call(method, &params).await.map_err(FabricError::from)
    }

    /// Idempotent read: retried on transient failures
    async fn read(&self, method: &str, params: Value) -> Result<Value> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.read_attempts - 1)
            .with_jitter()
            .build();

        let mut last_err = None;
        for delay in std::iter::once(Duration::ZERO).chain(backoff) {
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }

            match self.call(method, &params).await.map_err(FabricError::from) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !is_transient_fabric_error(&e) {
                        return Err(e);
                    }
                    warn!(method, error = %e, "Bridge read failed, retrying");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| FabricError::Rpc(format!("{method}: retry exhausted"))))
    }
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| FabricError::Decode(format!("{method}: {e}")))
}

/// Null means "nothing"; anything else must decode
fn decode_optional<T: DeserializeOwned>(method: &str, value: Value) -> Result<Option<T>> {
    if value.is_null() {
        Ok(None)
    } else {
        decode(method, value).map(Some)
    }
}

#[async_trait]
impl FabricClient for BridgeClient {
    // ========== Object Lifecycle ==========

    async fn create_content_object(
        &self,
        library_id: &LibraryId,
        content_type: Option<&str>,
    ) -> Result<CreatedObject> {
        let method = "create_content_object";
        let result = self
            .send(method, json!({ "library_id": library_id, "content_type": content_type }))
            .await?;
        decode(method, result)
    }

    async fn edit_content_object(
        &self,
        library_id: &LibraryId,
        object_id: &ObjectId,
    ) -> Result<WriteToken> {
        #[derive(Deserialize)]
        struct Edited {
            write_token: WriteToken,
        }

        let method = "edit_content_object";
        let result = self
            .send(method, json!({ "library_id": library_id, "object_id": object_id }))
            .await?;
        decode::<Edited>(method, result).map(|e| e.write_token)
    }

    async fn finalize_content_object(
        &self,
        library_id: &LibraryId,
        object_id: &ObjectId,
        write_token: &WriteToken,
        commit_message: &str,
        await_commit: bool,
    ) -> Result<FinalizedObject> {
        let method = "finalize_content_object";
        let result = self
            .send(
                method,
                json!({
                    "library_id": library_id,
                    "object_id": object_id,
                    "write_token": write_token,
                    "commit_message": commit_message,
                    "await_commit": await_commit,
                }),
            )
            .await?;
        decode(method, result)
    }

    async fn delete_content_object(
        &self,
        library_id: &LibraryId,
        object_id: &ObjectId,
    ) -> Result<()> {
        self.send(
            "delete_content_object",
            json!({ "library_id": library_id, "object_id": object_id }),
        )
        .await?;
        Ok(())
    }

    async fn content_object_library_id(&self, object_id: &ObjectId) -> Result<LibraryId> {
        let method = "content_object_library_id";
        let result = self.read(method, json!({ "object_id": object_id })).await?;
        decode_optional(method, result)?.ok_or_else(|| FabricError::NotFound(object_id.to_string()))
    }

    async fn latest_version_hash(&self, object_id: &ObjectId) -> Result<String> {
        let method = "latest_version_hash";
        let result = self.read(method, json!({ "object_id": object_id })).await?;
        decode_optional(method, result)?.ok_or_else(|| FabricError::EmptyResponse(method.to_string()))
    }

    async fn object_id_for_hash(&self, version_hash: &str) -> Result<ObjectId> {
        let method = "decode_version_hash";
        let result = self.read(method, json!({ "version_hash": version_hash })).await?;
        decode_optional(method, result)?.ok_or_else(|| FabricError::NotFound(version_hash.to_string()))
    }

    // ========== Metadata ==========

    async fn content_object_metadata(
        &self,
        library_id: &LibraryId,
        object_id: &ObjectId,
        path: &str,
        resolve_links: bool,
    ) -> Result<Option<Value>> {
        let result = self
            .read(
                "content_object_metadata",
                json!({
                    "library_id": library_id,
                    "object_id": object_id,
                    "metadata_subtree": path,
                    "resolve_links": resolve_links,
                }),
            )
            .await?;
        Ok((!result.is_null()).then_some(result))
    }

    async fn merge_metadata(
        &self,
        library_id: &LibraryId,
        object_id: &ObjectId,
        write_token: &WriteToken,
        path: &str,
        value: Value,
    ) -> Result<()> {
        self.send(
            "merge_metadata",
            json!({
                "library_id": library_id,
                "object_id": object_id,
                "write_token": write_token,
                "metadata_subtree": path,
                "metadata": value,
            }),
        )
        .await?;
        Ok(())
    }

    async fn replace_metadata(
        &self,
        library_id: &LibraryId,
        object_id: &ObjectId,
        write_token: &WriteToken,
        path: &str,
        value: Value,
    ) -> Result<()> {
        self.send(
            "replace_metadata",
            json!({
                "library_id": library_id,
                "object_id": object_id,
                "write_token": write_token,
                "metadata_subtree": path,
                "metadata": value,
            }),
        )
        .await?;
        Ok(())
    }

    // ========== Permissions ==========

    async fn set_permission(
        &self,
        object_id: &ObjectId,
        permission: ObjectPermission,
    ) -> Result<()> {
        self.send(
            "set_permission",
            json!({ "object_id": object_id, "permission": permission }),
        )
        .await?;
        Ok(())
    }

    async fn add_group_permission(&self, object_id: &ObjectId, group_address: &str) -> Result<()> {
        self.send(
            "add_content_object_group_permission",
            json!({ "object_id": object_id, "group_address": group_address, "permission": "manage" }),
        )
        .await?;
        Ok(())
    }

    async fn remove_group_permission(
        &self,
        object_id: &ObjectId,
        group_address: &str,
    ) -> Result<()> {
        self.send(
            "remove_content_object_group_permission",
            json!({ "object_id": object_id, "group_address": group_address, "permission": "manage" }),
        )
        .await?;
        Ok(())
    }

    // ========== Stream Control ==========

    async fn stream_status(&self, object_id: &ObjectId) -> Result<StatusResponse> {
        let method = "stream_status";
        let result = self
            .read(method, json!({ "name": object_id, "show_params": true }))
            .await?;
        if let Some(error) = result.get("error").filter(|e| !e.is_null()) {
            return Err(FabricError::remote(method, error));
        }
        decode(method, result)
    }

    async fn stream_lro(&self, object_id: &ObjectId, op: LroOperation) -> Result<ControlResponse> {
        let method = "stream_start_or_stop_or_reset";
        let result = self
            .send(method, json!({ "name": object_id, "op": op }))
            .await?;
        decode_optional(method, result).map(Option::unwrap_or_default)
    }

    async fn stream_start_recording(
        &self,
        object_id: &ObjectId,
    ) -> Result<Option<ControlResponse>> {
        let method = "stream_create";
        let result = self.send(method, json!({ "name": object_id, "start": true })).await?;
        decode_optional(method, result)
    }

    async fn stream_stop_recording(
        &self,
        object_id: &ObjectId,
    ) -> Result<Option<ControlResponse>> {
        let method = "stream_stop_session";
        let result = self.send(method, json!({ "name": object_id })).await?;
        decode_optional(method, result)
    }

    async fn stream_config(
        &self,
        object_id: &ObjectId,
        settings: &StreamSettings,
    ) -> Result<ProbeResult> {
        let method = "stream_config";
        let result = self
            .send(method, json!({ "name": object_id, "live_recording_config": settings }))
            .await?;
        if let Some(error) = result.get("error").filter(|e| !e.is_null()) {
            return Err(FabricError::remote(method, error));
        }
        decode_optional(method, result).map(Option::unwrap_or_default)
    }

    async fn stream_init(&self, object_id: &ObjectId, options: &InitOptions) -> Result<()> {
        self.send(
            "stream_init",
            json!({ "name": object_id, "drm": options.drm, "format": options.formats.join(",") }),
        )
        .await?;
        Ok(())
    }

    async fn stream_add_watermark(
        &self,
        object_id: &ObjectId,
        write_token: &WriteToken,
        watermark: &Watermark,
    ) -> Result<()> {
        self.send(
            "stream_add_watermark",
            json!({ "object_id": object_id, "write_token": write_token, "watermark": watermark }),
        )
        .await?;
        Ok(())
    }

    async fn stream_remove_watermark(
        &self,
        object_id: &ObjectId,
        write_token: &WriteToken,
        kinds: &[WatermarkKind],
    ) -> Result<()> {
        self.send(
            "stream_remove_watermark",
            json!({ "object_id": object_id, "write_token": write_token, "types": kinds }),
        )
        .await?;
        Ok(())
    }

    async fn stream_copy_to_vod(&self, request: &CopyToVodRequest) -> Result<Option<Value>> {
        let result = self
            .send("stream_copy_to_vod", serde_json::to_value(request)?)
            .await?;
        Ok((!result.is_null()).then_some(result))
    }

    async fn create_links(
        &self,
        library_id: &LibraryId,
        object_id: &ObjectId,
        write_token: &WriteToken,
        links: &[LinkSpec],
    ) -> Result<()> {
        self.send(
            "create_links",
            json!({
                "library_id": library_id,
                "object_id": object_id,
                "write_token": write_token,
                "links": links,
            }),
        )
        .await?;
        Ok(())
    }

    /// Built locally when a display app is configured, otherwise asked of
    /// the bridge
    async fn embed_url(&self, object_id: &ObjectId) -> Result<String> {
        if let Some(base) = &self.display_app_url {
            let mut url = Url::parse(base).map_err(|e| FabricError::Rpc(format!("display_app_url: {e}")))?;
            url.query_pairs_mut()
                .append_pair("net", &self.environment)
                .append_key_only("p")
                .append_pair("ct", "h")
                .append_pair("oid", object_id.as_str())
                .append_pair("mt", "lv");
            return Ok(url.into());
        }

        let method = "embed_url";
        let result = self.read(method, json!({ "object_id": object_id })).await?;
        decode(method, result)
    }

    // ========== Directory ==========

    async fn content_libraries(&self) -> Result<Vec<LibraryId>> {
        let method = "content_libraries";
        let result = self.read(method, json!({})).await?;
        decode_optional(method, result).map(Option::unwrap_or_default)
    }

    async fn library_name(&self, library_id: &LibraryId) -> Result<Option<String>> {
        let method = "content_library_metadata";
        let result = self
            .read(method, json!({ "library_id": library_id, "metadata_subtree": "public/name" }))
            .await?;
        decode_optional(method, result)
    }

    async fn access_groups(&self) -> Result<Vec<AccessGroup>> {
        let method = "list_access_groups";
        let result = self.read(method, json!({})).await?;
        decode_optional(method, result).map(Option::unwrap_or_default)
    }

    async fn drm_schemes(&self) -> Result<Vec<String>> {
        let method = "drm_schemes";
        let result = self.read(method, json!({})).await?;
        decode_optional(method, result).map(Option::unwrap_or_default)
    }
}

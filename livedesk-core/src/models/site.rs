use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use super::id::{LibraryId, ObjectId};

/// Site metadata path holding the stream listing
pub const SITE_STREAMS_PATH: &str = "public/asset_metadata/live_streams";
/// Site metadata path holding the ladder profile document
pub const SITE_PROFILES_PATH: &str = "public/asset_metadata/profiles";

/// One stream entry in the site listing.
///
/// The `/` and `.` keys make the entry a fabric link to the stream object's
/// public asset metadata, pinned to a version hash and auto-updated to the
/// latest version on read. Older entries carry only the link, in which case
/// the object is found from the linked version hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteEntry {
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_id: Option<LibraryId>,
    #[serde(rename = "/")]
    pub link: String,
    #[serde(rename = ".", default = "default_link_props")]
    pub link_props: Value,
}

fn default_link_props() -> Value {
    json!({ "auto_update": { "tag": "latest" } })
}

impl SiteEntry {
    #[must_use]
    pub fn new(order: u32, object_id: ObjectId, library_id: Option<LibraryId>, version_hash: &str) -> Self {
        Self {
            order,
            object_id: Some(object_id),
            library_id,
            link: link_target(version_hash),
            link_props: default_link_props(),
        }
    }

    /// Version hash the link is pinned to
    #[must_use]
    pub fn version_hash(&self) -> Option<&str> {
        self.link
            .strip_prefix("/qfab/")
            .and_then(|rest| rest.split('/').next())
            .filter(|hash| !hash.is_empty())
    }
}

#[must_use]
pub fn link_target(version_hash: &str) -> String {
    format!("/qfab/{version_hash}/meta/public/asset_metadata")
}

/// Decoded site listing, keyed by slug
pub type SiteListing = BTreeMap<String, SiteEntry>;

/// Site listing as stored. Writers edit this form so entries they do not
/// understand survive the rewrite.
pub type RawSiteListing = Map<String, Value>;

/// Order index for a newly appended entry
#[must_use]
pub fn next_order(listing: &RawSiteListing) -> u32 {
    listing
        .values()
        .map(|entry| entry.get("order").and_then(Value::as_u64).unwrap_or(0) + 1)
        .max()
        .map_or(0, |order| u32::try_from(order).unwrap_or(u32::MAX))
}

/// Point a stored entry's link at a newer version. False when the entry is
/// not an object.
pub fn repoint_entry(entry: &mut Value, version_hash: &str) -> bool {
    match entry.as_object_mut() {
        Some(fields) => {
            fields.insert("/".to_string(), Value::String(link_target(version_hash)));
            true
        }
        None => false,
    }
}

//! Observable in-memory stream cache
//!
//! Materialised view of the site listing, enriched with polled status. The
//! only write paths are [`StreamCache::update_stream`],
//! [`StreamCache::replace_all`] and [`StreamCache::remove_stream`]; every
//! write is announced on a broadcast channel.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::models::{ObjectId, Stream, StreamPatch};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change notification emitted after each cache write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    /// One entry was created or patched
    Updated { slug: String },
    /// The whole map was replaced after a reload
    Replaced { count: usize },
    /// One entry was removed
    Removed { slug: String },
}

/// Shared `slug -> Stream` store
#[derive(Clone)]
pub struct StreamCache {
    streams: Arc<RwLock<HashMap<String, Stream>>>,
    events: broadcast::Sender<CacheEvent>,
}

impl Default for StreamCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamCache {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            streams: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    /// Merge `patch` into the entry for `slug`, creating it if needed.
    ///
    /// The stored record always carries `slug` as its key, whatever the
    /// previous record held.
    pub fn update_stream(&self, slug: &str, patch: StreamPatch) {
        {
            let mut streams = self.streams.write();
            let entry = streams
                .entry(slug.to_string())
                .or_insert_with(|| Stream::new(slug));
            entry.apply(patch);
            entry.slug = slug.to_string();
        }
        self.emit(CacheEvent::Updated {
            slug: slug.to_string(),
        });
    }

    /// Replace the whole map after a full reload
    pub fn replace_all(&self, streams: HashMap<String, Stream>) {
        let streams: HashMap<String, Stream> = streams
            .into_iter()
            .map(|(slug, mut stream)| {
                stream.slug.clone_from(&slug);
                (slug, stream)
            })
            .collect();
        let count = streams.len();
        *self.streams.write() = streams;
        self.emit(CacheEvent::Replaced { count });
    }

    /// Remove one entry. Returns the removed record, if any.
    pub fn remove_stream(&self, slug: &str) -> Option<Stream> {
        let removed = self.streams.write().remove(slug);
        if removed.is_some() {
            self.emit(CacheEvent::Removed {
                slug: slug.to_string(),
            });
        }
        removed
    }

    /// Owned snapshot of one entry
    #[must_use]
    pub fn get(&self, slug: &str) -> Option<Stream> {
        self.streams.read().get(slug).cloned()
    }

    /// Owned snapshot of every entry, ordered by listing position then slug
    #[must_use]
    pub fn snapshot(&self) -> Vec<Stream> {
        let mut streams: Vec<Stream> = self.streams.read().values().cloned().collect();
        streams.sort_by(|a, b| {
            a.order
                .unwrap_or(u32::MAX)
                .cmp(&b.order.unwrap_or(u32::MAX))
                .then_with(|| a.slug.cmp(&b.slug))
        });
        streams
    }

    /// Linear scan by fabric object id
    #[must_use]
    pub fn find_by_object_id(&self, object_id: &ObjectId) -> Option<Stream> {
        self.streams
            .read()
            .values()
            .find(|s| s.object_id.as_ref() == Some(object_id))
            .cloned()
    }

    /// Slugs paired with object ids, for entries that have one
    #[must_use]
    pub fn pollable(&self) -> Vec<(String, ObjectId)> {
        self.streams
            .read()
            .values()
            .filter_map(|s| s.object_id.clone().map(|id| (s.slug.clone(), id)))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.read().is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: CacheEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }
}

//! Per-stream busy flags
//!
//! A flag is held by a [`BusyGuard`] and cleared when the guard drops, so
//! every exit path of an operation releases it.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct BusyTracker {
    flags: Arc<DashMap<String, &'static str>>,
}

impl BusyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `slug` busy with `operation`, or `None` if it already is
    #[must_use]
    pub fn try_acquire(&self, slug: &str, operation: &'static str) -> Option<BusyGuard> {
        match self.flags.entry(slug.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                entry.insert(operation);
                Some(BusyGuard {
                    flags: Arc::clone(&self.flags),
                    slug: slug.to_string(),
                })
            }
        }
    }

    /// Operation currently holding `slug`, if any
    #[must_use]
    pub fn current(&self, slug: &str) -> Option<&'static str> {
        self.flags.get(slug).map(|entry| *entry.value())
    }
}

pub struct BusyGuard {
    flags: Arc<DashMap<String, &'static str>>,
    slug: String,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flags.remove(&self.slug);
    }
}

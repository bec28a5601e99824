//! Site listing maintenance
//!
//! Writers read the stored listing, change only their own key, then replace
//! and finalize. Concurrent writers race and the last finalize wins.

use serde_json::Value;
use tracing::{debug, warn};

use super::{LifecycleService, StreamLocation};
use crate::error::Result;
use crate::models::{
    next_order, repoint_entry, LibraryId, ObjectId, RawSiteListing, SiteEntry, SiteListing,
    SITE_STREAMS_PATH,
};

impl LifecycleService {
    async fn read_raw_site_listing(&self) -> Result<RawSiteListing> {
        let value = self
            .fabric
            .content_object_metadata(
                &self.site.library_id,
                &self.site.object_id,
                SITE_STREAMS_PATH,
                false,
            )
            .await?;

        match value {
            Some(Value::Object(entries)) => Ok(entries),
            _ => Ok(RawSiteListing::new()),
        }
    }

    /// Read the listing, skipping entries that do not decode
    pub(super) async fn read_site_listing(&self) -> Result<SiteListing> {
        let mut listing = SiteListing::new();
        for (slug, entry) in self.read_raw_site_listing().await? {
            match serde_json::from_value::<SiteEntry>(entry) {
                Ok(entry) => {
                    listing.insert(slug, entry);
                }
                Err(e) => warn!(slug = %slug, error = %e, "Skipping malformed site entry"),
            }
        }
        Ok(listing)
    }

    async fn write_site_listing(&self, listing: RawSiteListing, message: &str) -> Result<String> {
        let site = StreamLocation {
            slug: String::new(),
            object_id: self.site.object_id.clone(),
            library_id: self.site.library_id.clone(),
        };
        let write_token = self.edit(&site).await?;
        self.fabric
            .replace_metadata(
                &site.library_id,
                &site.object_id,
                &write_token,
                SITE_STREAMS_PATH,
                Value::Object(listing),
            )
            .await?;
        self.finalize(&site, &write_token, message).await
    }

    /// Append a linked entry and return its order index
    pub(super) async fn add_site_entry(
        &self,
        slug: &str,
        object_id: &ObjectId,
        library_id: &LibraryId,
        version_hash: &str,
    ) -> Result<u32> {
        let mut listing = self.read_raw_site_listing().await?;
        let order = next_order(&listing);
        let entry = SiteEntry::new(order, object_id.clone(), Some(library_id.clone()), version_hash);
        listing.insert(slug.to_string(), serde_json::to_value(entry)?);
        self.write_site_listing(listing, &format!("Add live stream {slug}"))
            .await?;
        debug!(slug = %slug, order, "Site entry added");
        Ok(order)
    }

    /// Point an entry at a newer version. Missing entries are left alone.
    pub(super) async fn repoint_site_entry(&self, slug: &str, version_hash: &str) -> Result<()> {
        let mut listing = self.read_raw_site_listing().await?;
        let repointed = listing
            .get_mut(slug)
            .is_some_and(|entry| repoint_entry(entry, version_hash));
        if !repointed {
            warn!(slug = %slug, "No site entry to repoint");
            return Ok(());
        }
        self.write_site_listing(listing, &format!("Update live stream link {slug}"))
            .await?;
        Ok(())
    }

    /// Remove an entry. Returns false, without writing, when it was absent.
    pub(super) async fn remove_site_entry(&self, slug: &str) -> Result<bool> {
        let mut listing = self.read_raw_site_listing().await?;
        if listing.remove(slug).is_none() {
            return Ok(false);
        }
        self.write_site_listing(listing, &format!("Remove live stream {slug}"))
            .await?;
        Ok(true)
    }
}

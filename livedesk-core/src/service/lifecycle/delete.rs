use tracing::{info, warn};

use super::LifecycleService;
use crate::error::Result;

impl LifecycleService {
    /// Unlink a stream from the site, delete its object and drop it from the
    /// cache.
    ///
    /// The listing commit happens first. If the object delete then fails the
    /// object is orphaned; nothing rolls the listing back.
    pub async fn delete(&self, slug: &str) -> Result<()> {
        let location = self.locate(slug).await?;

        if !self.remove_site_entry(slug).await? {
            warn!(slug = %slug, "Stream was not in the site listing");
        }

        self.fabric
            .delete_content_object(&location.library_id, &location.object_id)
            .await?;

        self.cache.remove_stream(slug);
        info!(slug = %slug, object_id = %location.object_id, "Stream deleted");
        Ok(())
    }
}

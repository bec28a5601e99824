//! Service initialization and dependency injection

use std::sync::Arc;
use tracing::info;

use crate::cache::StreamCache;
use crate::fabric::FabricClient;
use crate::models::{LibraryId, ObjectId};
use crate::service::{
    Confirmer, LifecycleService, Notifier, OperationDispatch, SiteRef, StatusPoller, StatusService,
    DEFAULT_FAN_OUT,
};
use crate::Config;

/// Container for all initialized services
#[derive(Clone)]
pub struct Services {
    /// Shared stream store
    pub cache: StreamCache,
    /// Single-stream status checks
    pub status: StatusService,
    /// Background status sweeps
    pub poller: Arc<StatusPoller>,
    /// Stream lifecycle orchestration
    pub lifecycle: Arc<LifecycleService>,
}

impl Services {
    /// Build the dispatch layer over these services
    #[must_use]
    pub fn dispatch(&self, confirmer: Arc<dyn Confirmer>, notifier: Arc<dyn Notifier>) -> OperationDispatch {
        OperationDispatch::new(Arc::clone(&self.lifecycle), confirmer, notifier)
    }
}

/// Wire every service around one fabric client. This is the only place
/// that knows how the pieces fit together.
pub fn init_services(config: &Config, fabric: Arc<dyn FabricClient>) -> Services {
    info!("Initializing services...");

    let cache = StreamCache::new();
    let status = StatusService::new(Arc::clone(&fabric), cache.clone());
    let poller = Arc::new(StatusPoller::new(
        status.clone(),
        cache.clone(),
        config.poller.concurrency,
    ));

    let site = SiteRef {
        library_id: LibraryId::from_string(config.site.library_id.clone()),
        object_id: ObjectId::from_string(config.site.object_id.clone()),
    };
    let lifecycle = Arc::new(
        LifecycleService::new(fabric, cache.clone(), status.clone(), Arc::clone(&poller), site)
            .with_access_group(config.site.access_group.clone())
            .with_stream_content_type(config.site.stream_content_type.clone())
            .with_fan_out(DEFAULT_FAN_OUT),
    );

    info!(
        poller_concurrency = config.poller.concurrency,
        access_group = ?config.site.access_group,
        "Services initialized"
    );

    Services {
        cache,
        status,
        poller,
        lifecycle,
    }
}

//! Application state.

use std::sync::Arc;

use mockable::Clock;

use mydaily_store::Store;

use crate::config::ServiceConfig;
use crate::transport::PushTransport;
use crate::triggers::Triggers;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Time source for request defaults.
    pub clock: Arc<dyn Clock + Send + Sync>,

    /// The notification pipeline.
    pub triggers: Arc<Triggers>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        transport: Arc<dyn PushTransport>,
        clock: Arc<dyn Clock + Send + Sync>,
        config: ServiceConfig,
    ) -> Self {
        let triggers = Arc::new(Triggers::new(
            Arc::clone(&store),
            transport,
            Arc::clone(&clock),
            &config.pipeline,
        ));

        tracing::info!(
            policy = %config.pipeline.policy,
            skip_backfill = config.pipeline.skip_backfill,
            "Notification pipeline configured"
        );

        Self {
            store,
            config,
            clock,
            triggers,
        }
    }
}

//! mydaily service - habit notifications and HTTP API.
//!
//! This is the main entry point for the mydaily service.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mydaily_service::provision::seed_users;
use mydaily_service::{
    create_router, AppState, FcmClient, PushTransport, ServiceConfig, StoreBackend,
    SweepScheduler, UnconfiguredTransport,
};
use mydaily_store::{MemoryStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mydaily=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting mydaily service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        store_backend = ?config.store_backend,
        policy = %config.pipeline.policy,
        sweep_interval_secs = config.sweep_interval.as_secs(),
        fcm_configured = config.fcm.is_configured(),
        "Service configuration loaded"
    );

    let store = open_store(&config)?;

    if config.seed_users > 0 {
        seed_users(store.as_ref(), config.seed_users).await?;
    }

    let transport: Arc<dyn PushTransport> = match FcmClient::from_config(&config.fcm)? {
        Some(client) => {
            tracing::info!(project_id = %client.project_id(), "FCM push enabled");
            Arc::new(client)
        }
        None => {
            tracing::warn!("FCM not configured - notifications will not be delivered");
            Arc::new(UnconfiguredTransport)
        }
    };

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(DefaultClock);
    let state = AppState::new(store, transport, clock, config.clone());

    // Start the sweep scheduler
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let scheduler = SweepScheduler::new(Arc::clone(&state.triggers), config.sweep_interval);
    let scheduler_task = tokio::spawn(scheduler.run(async move {
        let _ = shutdown_rx.changed().await;
    }));

    let app = create_router(state);

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler_task.await {
        tracing::error!(error = %e, "Sweep scheduler task failed");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store - data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "rocksdb-backend")]
        StoreBackend::RocksDb => {
            tracing::info!(path = %config.data_dir, "Opening RocksDB store");
            Ok(Arc::new(mydaily_store::RocksStore::open(&config.data_dir)?))
        }
        #[cfg(not(feature = "rocksdb-backend"))]
        StoreBackend::RocksDb => {
            Err("STORE_BACKEND=rocksdb requires the rocksdb-backend feature".into())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

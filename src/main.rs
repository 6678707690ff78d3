// SPDX-License-Identifier: MIT

//! Sportmate API server.

use sportmate::{
    config::{Config, StoreBackend},
    db::{ActivityStore, FirestoreStore, MemoryStore},
    services::{
        ActivityRegistry, FirestoreDirectory, FirestoreSink, MembershipWorkflow, MemoryDirectory,
        MemorySink, NotificationSink, UserDirectory,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Sportmate API");

    // Wire the persistence backend
    let (store, directory, sink): (
        Arc<dyn ActivityStore>,
        Arc<dyn UserDirectory>,
        Arc<dyn NotificationSink>,
    ) = match config.store_backend {
        StoreBackend::Firestore => {
            let client = sportmate::db::firestore::connect(&config.gcp_project_id)
                .await
                .expect("Failed to connect to Firestore");
            (
                Arc::new(FirestoreStore::new(client.clone())),
                Arc::new(FirestoreDirectory::new(client.clone())),
                Arc::new(FirestoreSink::new(client)),
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data will not survive restarts");
            (
                Arc::new(MemoryStore::new()),
                Arc::new(MemoryDirectory::new()),
                Arc::new(MemorySink::new()),
            )
        }
    };

    let registry = ActivityRegistry::new(
        store.clone(),
        directory.clone(),
        config.default_page_size,
        config.max_page_size,
    );
    let workflow = MembershipWorkflow::new(store, directory, sink, config.update_retry_attempts);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        registry,
        workflow,
    });

    // Build router
    let app = sportmate::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sportmate=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}

//! applog HTTP server binary entry point.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use applog::server::{AppServer, CliArgs, ServerConfig};
use applog::{AppDirectory, StoreRegistry};
use common::clock::SystemClock;
use common::storage::factory::create_storage;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI arguments
    let args = CliArgs::parse();
    let config = args.to_config();
    let server_config = ServerConfig::from(&args);

    tracing::info!("Opening app stores with config: {:?}", config);

    // The app directory gets its own storage namespace; app identifiers
    // cannot contain '/', so it never collides with an app's store.
    let directory_storage = create_storage(&config.storage.scoped("directory"))
        .await
        .expect("Failed to open app directory storage");
    let directory = Arc::new(AppDirectory::new(directory_storage, Arc::new(SystemClock)));

    let registry = Arc::new(StoreRegistry::new(config));

    // Create and run the server
    let server = AppServer::new(registry, directory, server_config);
    server.run().await;
}

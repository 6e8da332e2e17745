//! CLI and server configuration.

use clap::Parser;
use common::storage::config::{
    LocalObjectStoreConfig, ObjectStoreConfig, SlateDbStorageConfig, StorageConfig,
};

use crate::config::Config;

/// Command-line arguments for the applog server.
#[derive(Debug, Parser)]
#[command(name = "applog-server", about = "Multi-tenant log-ingestion service")]
pub struct CliArgs {
    /// Port to listen on.
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Keep all data in memory instead of durable storage.
    #[arg(long)]
    pub in_memory: bool,

    /// Directory for durable storage data.
    #[arg(long, default_value = ".data")]
    pub data_path: String,

    /// Days of daily statistics retained per app.
    #[arg(long, default_value_t = 30)]
    pub stats_retention_days: u32,
}

impl CliArgs {
    /// Builds the store configuration from the parsed arguments.
    pub fn to_config(&self) -> Config {
        let storage = if self.in_memory {
            StorageConfig::InMemory
        } else {
            StorageConfig::SlateDb(SlateDbStorageConfig {
                path: "applog".to_string(),
                object_store: ObjectStoreConfig::Local(LocalObjectStoreConfig {
                    path: self.data_path.clone(),
                }),
                settings_path: None,
            })
        };
        Config {
            storage,
            stats_retention_days: self.stats_retention_days,
            ..Default::default()
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl From<&CliArgs> for ServerConfig {
    fn from(args: &CliArgs) -> Self {
        Self { port: args.port }
    }
}

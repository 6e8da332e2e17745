//! Storage configuration.
//!
//! Services select a backend through [`StorageConfig`], which deserializes
//! from config files or CLI-derived settings. The in-memory backend exists
//! for tests and development; SlateDB is the durable default.

use serde::{Deserialize, Serialize};

/// Top-level storage backend selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum StorageConfig {
    InMemory,
    SlateDb(SlateDbStorageConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::SlateDb(SlateDbStorageConfig::default())
    }
}

impl StorageConfig {
    /// Derives the configuration for an isolated sub-store.
    ///
    /// Each app's store lives in its own storage namespace: in-memory
    /// backends are created per instance and need no scoping, while SlateDB
    /// backends place each scope under its own path prefix.
    pub fn scoped(&self, name: &str) -> StorageConfig {
        match self {
            StorageConfig::InMemory => StorageConfig::InMemory,
            StorageConfig::SlateDb(config) => StorageConfig::SlateDb(SlateDbStorageConfig {
                path: format!("{}/{}", config.path, name),
                ..config.clone()
            }),
        }
    }
}

/// SlateDB backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlateDbStorageConfig {
    /// Path prefix for the database inside the object store.
    pub path: String,

    /// Object store provider backing the database.
    pub object_store: ObjectStoreConfig,

    /// Optional path to a SlateDB settings file.
    ///
    /// When absent, SlateDB's own `Settings::load()` resolution applies
    /// (settings file in the working directory plus `SLATEDB_` environment
    /// variables).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<String>,
}

impl Default for SlateDbStorageConfig {
    fn default() -> Self {
        Self {
            path: "applog".to_string(),
            object_store: ObjectStoreConfig::default(),
            settings_path: None,
        }
    }
}

/// Object store provider configuration.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ObjectStoreConfig {
    /// In-memory object store, for tests and development.
    #[default]
    InMemory,

    /// AWS S3.
    Aws(AwsObjectStoreConfig),

    /// Local filesystem.
    Local(LocalObjectStoreConfig),
}

/// AWS S3 object store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AwsObjectStoreConfig {
    /// AWS region, e.g. "us-west-2".
    pub region: String,

    /// Bucket name.
    pub bucket: String,
}

/// Local filesystem object store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalObjectStoreConfig {
    /// Directory holding the store's data.
    pub path: String,
}

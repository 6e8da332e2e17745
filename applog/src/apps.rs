//! The app directory: registered apps with generated API keys.
//!
//! A plain keyed-record store handed to the façade, replacing any
//! process-global registry. The directory only stores records; checking
//! API keys is the auth layer's concern, not the directory's.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{Clock, Record, Storage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::serde::{app_key, app_scan_range, decode_document, encode_document};

/// One registered app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRecord {
    /// Stable identifier; also the app's storage address.
    pub name: String,
    /// Generated API key handed to the app on registration.
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

/// Keyed store of registered apps.
pub struct AppDirectory {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    // Serializes create/delete so duplicate checks cannot race.
    write_lock: tokio::sync::Mutex<()>,
}

impl AppDirectory {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Registers a new app and returns its record with a fresh API key.
    ///
    /// Registering an existing name is a validation error.
    pub async fn create(&self, name: &str) -> Result<AppRecord> {
        if name.is_empty() {
            return Err(Error::Validation("app name must not be empty".to_string()));
        }

        let _guard = self.write_lock.lock().await;
        if self.storage.get(app_key(name)).await?.is_some() {
            return Err(Error::Validation(format!(
                "app {:?} is already registered",
                name
            )));
        }

        let record = AppRecord {
            name: name.to_string(),
            api_key: Uuid::new_v4().to_string(),
            created_at: self.clock.now().into(),
        };
        self.storage
            .put(vec![Record::new(app_key(name), encode_document(&record)?)])
            .await?;
        Ok(record)
    }

    /// Looks up one registered app.
    pub async fn get(&self, name: &str) -> Result<Option<AppRecord>> {
        match self.storage.get(app_key(name)).await? {
            Some(record) => Ok(Some(decode_document(&record.value)?)),
            None => Ok(None),
        }
    }

    /// Lists every registered app, ordered by name.
    pub async fn list(&self) -> Result<Vec<AppRecord>> {
        let mut iter = self.storage.scan_iter(app_scan_range()).await?;
        let mut records = Vec::new();
        while let Some(record) = iter.next().await? {
            records.push(decode_document(&record.value)?);
        }
        Ok(records)
    }

    /// Removes a registered app. Unknown names are a not-found error.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.storage.get(app_key(name)).await?.is_none() {
            return Err(Error::NotFound(format!("app {:?} is not registered", name)));
        }
        self.storage.delete(vec![app_key(name)]).await?;
        Ok(())
    }
}

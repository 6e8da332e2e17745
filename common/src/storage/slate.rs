//! SlateDB-backed storage.
//!
//! SlateDB is an embedded LSM key-value store layered on object storage,
//! giving the log service cloud-native durability behind the same trait the
//! in-memory backend implements.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use slatedb::{Db, DbIterator, WriteBatch};

use super::{Record, Storage, StorageError, StorageIterator, StorageRead, StorageResult, WriteOptions};
use crate::util::BytesRange;

/// Storage backend persisting records in a SlateDB database.
pub struct SlateDbStorage {
    db: Arc<Db>,
}

impl SlateDbStorage {
    /// Wraps an already-opened SlateDB database.
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StorageRead for SlateDbStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let value = self
            .db
            .get(&key)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(value.map(|v| Record::new(key, v)))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + '_>> {
        let iter = self
            .db
            .scan(range)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(Box::new(SlateDbIterator { iter }))
    }
}

#[async_trait]
impl Storage for SlateDbStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn put_with_options(
        &self,
        records: Vec<Record>,
        options: WriteOptions,
    ) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        for record in &records {
            batch.put(&record.key, &record.value);
        }
        self.db
            .write(batch)
            .await
            .map_err(StorageError::from_storage)?;
        if options.await_durable {
            self.db.flush().await.map_err(StorageError::from_storage)?;
        }
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn delete(&self, keys: Vec<Bytes>) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        for key in &keys {
            batch.delete(key);
        }
        self.db
            .write(batch)
            .await
            .map_err(StorageError::from_storage)
    }
}

struct SlateDbIterator<'a> {
    iter: DbIterator<'a>,
}

#[async_trait]
impl StorageIterator for SlateDbIterator<'_> {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        match self.iter.next().await.map_err(StorageError::from_storage)? {
            Some(entry) => Ok(Some(Record::new(entry.key, entry.value))),
            None => Ok(None),
        }
    }
}

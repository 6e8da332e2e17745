//! In-memory storage backend.
//!
//! Keeps records in a `BTreeMap` so scans observe the same key ordering as
//! the durable backend. Intended for tests and local development.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use super::{Record, Storage, StorageIterator, StorageRead, StorageResult, WriteOptions};
use crate::util::BytesRange;

/// Storage backend holding all records in process memory.
pub struct InMemoryStorage {
    data: RwLock<BTreeMap<Bytes, Bytes>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageRead for InMemoryStorage {
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let data = self.data.read().expect("lock poisoned");
        Ok(data
            .get(&key)
            .map(|value| Record::new(key.clone(), value.clone())))
    }

    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + '_>> {
        use std::ops::RangeBounds;

        // Snapshot the matching records so the iterator does not hold the lock.
        let records: Vec<Record> = {
            let data = self.data.read().expect("lock poisoned");
            data.range((range.start_bound().cloned(), range.end_bound().cloned()))
                .map(|(key, value)| Record::new(key.clone(), value.clone()))
                .collect()
        };
        Ok(Box::new(SnapshotIterator {
            records: records.into_iter(),
        }))
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn put_with_options(
        &self,
        records: Vec<Record>,
        _options: WriteOptions,
    ) -> StorageResult<()> {
        let mut data = self.data.write().expect("lock poisoned");
        for record in records {
            data.insert(record.key, record.value);
        }
        Ok(())
    }

    async fn delete(&self, keys: Vec<Bytes>) -> StorageResult<()> {
        let mut data = self.data.write().expect("lock poisoned");
        for key in keys {
            data.remove(&key);
        }
        Ok(())
    }
}

struct SnapshotIterator {
    records: std::vec::IntoIter<Record>,
}

#[async_trait]
impl StorageIterator for SnapshotIterator {
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        Ok(self.records.next())
    }
}

//! Key/value storage abstraction.
//!
//! Backends expose ordered byte-key storage with atomic batch writes. The
//! service layers its record encodings on top; storage itself never
//! interprets keys or values.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use crate::util::BytesRange;

pub mod config;
pub mod factory;
pub mod in_memory;
pub mod slate;

/// A single key/value record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }
}

/// Errors raised by storage backends.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// Failure in the underlying backend, carrying its message.
    Storage(String),
}

impl StorageError {
    /// Wraps any backend error into a [`StorageError`].
    pub fn from_storage<E: fmt::Display>(err: E) -> Self {
        StorageError::Storage(err.to_string())
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Options controlling write durability.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// When `true`, the write does not return until the backend reports the
    /// data durable (e.g. flushed to the object store).
    pub await_durable: bool,
}

/// Iterator over records produced by a scan.
#[async_trait]
pub trait StorageIterator {
    /// Returns the next record in key order, or `None` when exhausted.
    async fn next(&mut self) -> StorageResult<Option<Record>>;
}

/// Read operations on a storage backend.
#[async_trait]
pub trait StorageRead: Send + Sync {
    /// Gets a single record by key, or `None` if absent.
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>>;

    /// Scans records within a key range, in ascending key order.
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + '_>>;
}

/// Read/write operations on a storage backend.
///
/// `put` and `delete` apply their whole batch atomically: either every
/// record in the batch becomes visible, or none does.
#[async_trait]
pub trait Storage: StorageRead {
    /// Writes a batch of records atomically with default options.
    async fn put(&self, records: Vec<Record>) -> StorageResult<()> {
        self.put_with_options(records, WriteOptions::default())
            .await
    }

    /// Writes a batch of records atomically.
    async fn put_with_options(
        &self,
        records: Vec<Record>,
        options: WriteOptions,
    ) -> StorageResult<()>;

    /// Deletes a batch of keys atomically. Missing keys are ignored.
    async fn delete(&self, keys: Vec<Bytes>) -> StorageResult<()>;
}

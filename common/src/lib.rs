//! Shared infrastructure for the applog services.
//!
//! This crate provides the storage abstraction used by the log service: a
//! small key/value [`Storage`] trait with ordered scans and atomic batch
//! writes, an in-memory backend for tests and development, a SlateDB-backed
//! durable backend, and a factory that selects a backend from configuration.
//! It also provides the [`Clock`] trait used to make time-dependent logic
//! testable.

pub mod clock;
pub mod storage;
pub mod util;

pub use clock::Clock;
pub use storage::{
    Record, Storage, StorageError, StorageIterator, StorageRead, StorageResult, WriteOptions,
};
pub use util::BytesRange;

//! Persistent sequence allocation.
//!
//! Sequence numbers make record keys unique (including within one batch and
//! one millisecond) and survive restarts: the allocator reserves blocks of
//! numbers by persisting the reservation boundary, and the reservation
//! record rides in the same atomic batch as the records that consume it.
//! After a restart the allocator resumes from the persisted boundary,
//! skipping any unused part of the last block.

use std::sync::Arc;

use common::{Record, Storage};

use crate::error::Result;
use crate::serde::{RecordType, SeqBlock, seq_block_key};

/// Numbers reserved per persisted block record.
const BLOCK_SIZE: u64 = 1024;

/// Allocates monotonically increasing sequence numbers backed by storage.
///
/// Mutation follows a build/apply pair: [`build_delta`] computes the
/// allocation and appends the reservation record to the pending batch
/// without changing allocator state; [`apply_delta`] commits the state after
/// the batch is durably written. A failed write therefore leaves the
/// allocator consistent with storage.
///
/// [`build_delta`]: SequenceAllocator::build_delta
/// [`apply_delta`]: SequenceAllocator::apply_delta
pub struct SequenceAllocator {
    record_type: RecordType,
    next: u64,
    reserved: u64,
}

/// Pending allocation produced by [`SequenceAllocator::build_delta`].
#[derive(Debug, Clone, Copy)]
pub struct SequenceDelta {
    base: u64,
    next: u64,
    reserved: u64,
}

impl SequenceDelta {
    /// First sequence number of the allocation.
    pub fn base_sequence(&self) -> u64 {
        self.base
    }
}

impl SequenceAllocator {
    /// Opens the allocator, resuming from the persisted reservation.
    pub async fn open(storage: &Arc<dyn Storage>, record_type: RecordType) -> Result<Self> {
        let next = match storage.get(seq_block_key(record_type)).await? {
            Some(record) => SeqBlock::deserialize(&record.value)?.next_sequence,
            None => 0,
        };
        Ok(Self {
            record_type,
            next,
            reserved: next,
        })
    }

    /// Allocates `count` consecutive sequence numbers.
    ///
    /// When the allocation exhausts the current reservation, a new block
    /// record is appended to `records` so the reservation persists with the
    /// caller's batch.
    pub fn build_delta(&self, count: u64, records: &mut Vec<Record>) -> SequenceDelta {
        let base = self.next;
        let next = base + count;
        let mut reserved = self.reserved;
        if next > reserved {
            reserved = next + BLOCK_SIZE;
            records.push(Record::new(
                seq_block_key(self.record_type),
                SeqBlock::new(reserved).serialize(),
            ));
        }
        SequenceDelta {
            base,
            next,
            reserved,
        }
    }

    /// Commits a delta after its batch was written.
    pub fn apply_delta(&mut self, delta: SequenceDelta) {
        self.next = delta.next;
        self.reserved = delta.reserved;
    }
}

#[cfg(test)]
mod tests {
    use common::storage::in_memory::InMemoryStorage;

    use super::*;

    fn storage() -> Arc<dyn Storage> {
        Arc::new(InMemoryStorage::new())
    }

    #[tokio::test]
    async fn should_start_at_zero_on_fresh_storage() {
        // given
        let storage = storage();

        // when
        let allocator = SequenceAllocator::open(&storage, RecordType::EntrySeq)
            .await
            .unwrap();
        let mut records = Vec::new();
        let delta = allocator.build_delta(3, &mut records);

        // then
        assert_eq!(delta.base_sequence(), 0);
    }

    #[tokio::test]
    async fn should_allocate_consecutive_ranges() {
        // given
        let storage = storage();
        let mut allocator = SequenceAllocator::open(&storage, RecordType::EntrySeq)
            .await
            .unwrap();

        // when
        let mut records = Vec::new();
        let first = allocator.build_delta(3, &mut records);
        storage.put(records).await.unwrap();
        allocator.apply_delta(first);

        let mut records = Vec::new();
        let second = allocator.build_delta(2, &mut records);

        // then
        assert_eq!(first.base_sequence(), 0);
        assert_eq!(second.base_sequence(), 3);
    }

    #[tokio::test]
    async fn should_persist_reservation_with_the_batch() {
        // given
        let storage = storage();
        let mut allocator = SequenceAllocator::open(&storage, RecordType::EntrySeq)
            .await
            .unwrap();

        // when - allocate and write the batch
        let mut records = Vec::new();
        let delta = allocator.build_delta(5, &mut records);
        assert_eq!(records.len(), 1);
        storage.put(records).await.unwrap();
        allocator.apply_delta(delta);

        // then - a reopened allocator resumes past the reservation
        let reopened = SequenceAllocator::open(&storage, RecordType::EntrySeq)
            .await
            .unwrap();
        let mut records = Vec::new();
        let delta = reopened.build_delta(1, &mut records);
        assert!(delta.base_sequence() >= 5);
    }

    #[tokio::test]
    async fn should_not_advance_state_when_delta_is_dropped() {
        // given
        let storage = storage();
        let allocator = SequenceAllocator::open(&storage, RecordType::EntrySeq)
            .await
            .unwrap();

        // when - build a delta but never apply it (write failed)
        let mut records = Vec::new();
        let _ = allocator.build_delta(7, &mut records);

        // then - the next allocation starts from the same base
        let mut records = Vec::new();
        let delta = allocator.build_delta(1, &mut records);
        assert_eq!(delta.base_sequence(), 0);
    }

    #[tokio::test]
    async fn should_skip_block_record_while_reservation_lasts() {
        // given
        let storage = storage();
        let mut allocator = SequenceAllocator::open(&storage, RecordType::EntrySeq)
            .await
            .unwrap();
        let mut records = Vec::new();
        let delta = allocator.build_delta(1, &mut records);
        storage.put(records).await.unwrap();
        allocator.apply_delta(delta);

        // when - the next small allocation fits the existing reservation
        let mut records = Vec::new();
        let _ = allocator.build_delta(1, &mut records);

        // then - no new block record is emitted
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn should_keep_separate_counters_per_record_type() {
        // given
        let storage = storage();
        let mut entries = SequenceAllocator::open(&storage, RecordType::EntrySeq)
            .await
            .unwrap();
        let health = SequenceAllocator::open(&storage, RecordType::HealthSeq)
            .await
            .unwrap();

        // when - consume entry sequences
        let mut records = Vec::new();
        let delta = entries.build_delta(10, &mut records);
        storage.put(records).await.unwrap();
        entries.apply_delta(delta);

        // then - health sequences are unaffected
        let mut records = Vec::new();
        let delta = health.build_delta(1, &mut records);
        assert_eq!(delta.base_sequence(), 0);
    }
}

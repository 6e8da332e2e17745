#![allow(dead_code)]

//! Storage encodings for app store records.
//!
//! Every stored key starts with a version byte and a record-type byte:
//!
//! ```text
//! | version (u8) | type (u8) | ... record-specific fields ... |
//! ```
//!
//! Time-ordered records (log entries, health results) append a millisecond
//! timestamp and a sequence number, both big-endian, so lexicographic key
//! order equals chronological order and same-millisecond entries keep their
//! append order. Daily statistics key on the day number. Values are JSON
//! documents.
//!
//! # Record Types
//!
//! - `Entry` (0x01): one log entry
//! - `EntrySeq` (0x02): sequence block reservation for entry ids
//! - `DailyStat` (0x03): one day's counters
//! - `HealthUrls` (0x04): the configured health-check URL list
//! - `HealthResult` (0x05): one health probe outcome
//! - `HealthSeq` (0x06): sequence block reservation for health results
//! - `App` (0x07): one registered app record (app directory only)

use std::ops::{Bound, Range};

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{Days, NaiveDate};
use common::BytesRange;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Key format version.
pub const KEY_VERSION: u8 = 0x01;

/// Record type discriminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Entry = 0x01,
    EntrySeq = 0x02,
    DailyStat = 0x03,
    HealthUrls = 0x04,
    HealthResult = 0x05,
    HealthSeq = 0x06,
    App = 0x07,
}

impl RecordType {
    /// Returns the record type ID.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Converts a record type ID back to a RecordType.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0x01 => Ok(RecordType::Entry),
            0x02 => Ok(RecordType::EntrySeq),
            0x03 => Ok(RecordType::DailyStat),
            0x04 => Ok(RecordType::HealthUrls),
            0x05 => Ok(RecordType::HealthResult),
            0x06 => Ok(RecordType::HealthSeq),
            0x07 => Ok(RecordType::App),
            _ => Err(Error::Encoding(format!("invalid record type: 0x{:02x}", id))),
        }
    }

    /// The two-byte key prefix for this record type.
    pub fn key_prefix(self) -> [u8; 2] {
        [KEY_VERSION, self.id()]
    }

    /// The exclusive upper key bound covering every key of this type.
    fn prefix_end(self) -> Bytes {
        Bytes::copy_from_slice(&[KEY_VERSION, self.id() + 1])
    }
}

/// Converts a chrono millisecond timestamp to the unsigned key component.
///
/// Pre-epoch timestamps clamp to zero so key order stays consistent.
pub fn clamp_millis(ms: i64) -> u64 {
    ms.max(0) as u64
}

/// Key for a time-ordered record (log entry or health result).
///
/// ```text
/// | version (u8) | type (u8) | timestamp_ms (u64 BE) | sequence (u64 BE) |
/// ```
///
/// The sequence component makes keys unique and preserves append order
/// within a single millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedKey {
    pub record_type: RecordType,
    pub timestamp_ms: u64,
    pub sequence: u64,
}

impl TimedKey {
    pub fn new(record_type: RecordType, timestamp_ms: i64, sequence: u64) -> Self {
        Self {
            record_type,
            timestamp_ms: clamp_millis(timestamp_ms),
            sequence,
        }
    }

    /// Serializes the key for storage.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(18);
        buf.put_slice(&self.record_type.key_prefix());
        buf.put_u64(self.timestamp_ms);
        buf.put_u64(self.sequence);
        buf.freeze()
    }

    /// Deserializes a key, checking the expected record type.
    pub fn deserialize(record_type: RecordType, data: &[u8]) -> Result<Self> {
        if data.len() != 18 {
            return Err(Error::Encoding(format!(
                "timed key must be 18 bytes, got {}",
                data.len()
            )));
        }
        if data[0] != KEY_VERSION {
            return Err(Error::Encoding(format!(
                "unsupported key version: 0x{:02x}",
                data[0]
            )));
        }
        let actual = RecordType::from_id(data[1])?;
        if actual != record_type {
            return Err(Error::Encoding(format!(
                "invalid record type: expected {:?}, got {:?}",
                record_type, actual
            )));
        }
        let timestamp_ms = u64::from_be_bytes(data[2..10].try_into().expect("sized slice"));
        let sequence = u64::from_be_bytes(data[10..18].try_into().expect("sized slice"));
        Ok(Self {
            record_type,
            timestamp_ms,
            sequence,
        })
    }

    /// Storage key range covering all records of `record_type` whose
    /// timestamp falls in `ts_range` (half-open, milliseconds).
    ///
    /// An inverted range collapses to an empty one.
    pub fn scan_range(record_type: RecordType, ts_range: Range<u64>) -> BytesRange {
        let end_ms = ts_range.end.max(ts_range.start);
        let start = TimedKey {
            record_type,
            timestamp_ms: ts_range.start,
            sequence: 0,
        }
        .serialize();
        let end = if end_ms == u64::MAX {
            record_type.prefix_end()
        } else {
            TimedKey {
                record_type,
                timestamp_ms: end_ms,
                sequence: 0,
            }
            .serialize()
        };
        BytesRange::new(Bound::Included(start), Bound::Excluded(end))
    }
}

/// Key for a daily statistics record.
///
/// ```text
/// | version (u8) | type (u8) | day number (u32 BE) |
/// ```
///
/// The day number counts days since 1970-01-01 (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatKey {
    pub day: u32,
}

impl StatKey {
    pub fn from_date(date: NaiveDate) -> Self {
        let days = date.signed_duration_since(epoch()).num_days();
        Self {
            day: days.clamp(0, u32::MAX as i64) as u32,
        }
    }

    /// Recovers the calendar date this key stands for.
    pub fn date(&self) -> Result<NaiveDate> {
        epoch()
            .checked_add_days(Days::new(self.day as u64))
            .ok_or_else(|| Error::Encoding(format!("day number out of range: {}", self.day)))
    }

    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(6);
        buf.put_slice(&RecordType::DailyStat.key_prefix());
        buf.put_u32(self.day);
        buf.freeze()
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        if data.len() != 6 || data[0] != KEY_VERSION || data[1] != RecordType::DailyStat.id() {
            return Err(Error::Encoding("invalid daily stat key".to_string()));
        }
        let day = u32::from_be_bytes(data[2..6].try_into().expect("sized slice"));
        Ok(Self { day })
    }

    /// Storage key range covering stat records with day numbers in
    /// `day_range` (half-open). An inverted range collapses to an empty one.
    pub fn scan_range(day_range: Range<u32>) -> BytesRange {
        let end_day = day_range.end.max(day_range.start);
        let start = StatKey {
            day: day_range.start,
        }
        .serialize();
        let end = if end_day == u32::MAX {
            RecordType::DailyStat.prefix_end()
        } else {
            StatKey { day: end_day }.serialize()
        };
        BytesRange::new(Bound::Included(start), Bound::Excluded(end))
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date")
}

/// Storage key for a sequence block record.
///
/// `record_type` must be one of the `*Seq` types.
pub fn seq_block_key(record_type: RecordType) -> Bytes {
    Bytes::copy_from_slice(&record_type.key_prefix())
}

/// Storage key for the configured health-check URL list.
pub fn health_urls_key() -> Bytes {
    Bytes::copy_from_slice(&RecordType::HealthUrls.key_prefix())
}

/// Storage key for a registered app record in the app directory.
pub fn app_key(name: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(2 + name.len());
    buf.put_slice(&RecordType::App.key_prefix());
    buf.put_slice(name.as_bytes());
    buf.freeze()
}

/// Storage key range covering every registered app record.
pub fn app_scan_range() -> BytesRange {
    BytesRange::new(
        Bound::Included(Bytes::copy_from_slice(&RecordType::App.key_prefix())),
        Bound::Excluded(RecordType::App.prefix_end()),
    )
}

/// Sequence block reservation persisted by a [`SequenceAllocator`].
///
/// [`SequenceAllocator`]: crate::sequence::SequenceAllocator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqBlock {
    /// First sequence number not covered by the reservation.
    pub next_sequence: u64,
}

impl SeqBlock {
    pub fn new(next_sequence: u64) -> Self {
        Self { next_sequence }
    }

    pub fn serialize(&self) -> Bytes {
        Bytes::copy_from_slice(&self.next_sequence.to_be_bytes())
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let bytes: [u8; 8] = data
            .try_into()
            .map_err(|_| Error::Encoding("sequence block must be 8 bytes".to_string()))?;
        Ok(Self {
            next_sequence: u64::from_be_bytes(bytes),
        })
    }
}

/// Encodes a stored document value as JSON.
pub fn encode_document<T: Serialize>(value: &T) -> Result<Bytes> {
    let data = serde_json::to_vec(value).map_err(|e| Error::Encoding(e.to_string()))?;
    Ok(Bytes::from(data))
}

/// Decodes a stored document value from JSON.
pub fn decode_document<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(|e| Error::Encoding(e.to_string()))
}

//! The entry store: per-app log entry persistence and querying.
//!
//! Entries are keyed by millisecond timestamp plus a persistent sequence
//! number, so storage scans return them in chronological order and query
//! time bounds translate directly into key ranges. Queries return entries
//! most-recent-first, which is what the dashboard and API rely on.
//!
//! # Timestamp bound convention
//!
//! `since` is inclusive, `until` is exclusive: a query matches entries with
//! `since <= timestamp < until`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{Clock, Record, Storage};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{LogEntry, LogLevel, PruneResult};
use crate::sequence::SequenceAllocator;
use crate::serde::{RecordType, TimedKey, clamp_millis, decode_document, encode_document};

/// One entry as submitted by a caller, before the store fills in id and
/// timestamp.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryInput {
    /// Requested level; must name one of the four valid levels.
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Conjunctive query filters; every field is independently optional.
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
    /// Exact level match; must name a valid level when present.
    pub level: Option<String>,
    /// Inclusive lower timestamp bound.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper timestamp bound.
    pub until: Option<DateTime<Utc>>,
    /// Exact correlation-id match.
    pub request_id: Option<String>,
    /// Result cap; the store default applies when absent.
    pub limit: Option<usize>,
    /// Number of matching entries to skip, for pagination.
    pub offset: Option<usize>,
}

/// Durable, ordered store of one app's log entries.
pub struct EntryStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    sequence: SequenceAllocator,
    default_limit: usize,
}

impl EntryStore {
    /// Opens the store over the app's storage namespace.
    pub async fn open(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        default_limit: usize,
    ) -> Result<Self> {
        let sequence = SequenceAllocator::open(&storage, RecordType::EntrySeq).await?;
        Ok(Self {
            storage,
            clock,
            sequence,
            default_limit,
        })
    }

    /// Appends one entry. Either the entry is durably persisted and
    /// returned fully populated, or an error is returned and nothing is
    /// stored.
    pub async fn append(&mut self, input: EntryInput) -> Result<LogEntry> {
        let mut entries = self.append_batch(vec![input]).await?;
        Ok(entries.pop().expect("batch of one yields one entry"))
    }

    /// Appends a batch of entries as one atomic storage write.
    ///
    /// Every input is validated before anything is written; the returned
    /// entries carry distinct ids and preserve submission order. A failure
    /// leaves the store untouched.
    pub async fn append_batch(&mut self, inputs: Vec<EntryInput>) -> Result<Vec<LogEntry>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let now: DateTime<Utc> = self.clock.now().into();
        let mut records = Vec::with_capacity(inputs.len() + 1);
        let delta = self.sequence.build_delta(inputs.len() as u64, &mut records);

        let mut entries = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.into_iter().enumerate() {
            let level = LogLevel::parse(&input.level)
                .ok_or_else(|| Error::Validation(format!("invalid level: {:?}", input.level)))?;
            if input.message.is_empty() {
                return Err(Error::Validation("message must not be empty".to_string()));
            }

            let sequence = delta.base_sequence() + i as u64;
            let entry = LogEntry {
                id: sequence.to_string(),
                level,
                message: input.message,
                context: input.context,
                request_id: input.request_id,
                timestamp: input.timestamp.unwrap_or(now),
            };

            let key = TimedKey::new(
                RecordType::Entry,
                entry.timestamp.timestamp_millis(),
                sequence,
            );
            records.push(Record::new(key.serialize(), encode_document(&entry)?));
            entries.push(entry);
        }

        self.storage.put(records).await?;
        self.sequence.apply_delta(delta);
        Ok(entries)
    }

    /// Queries entries matching every given filter, most-recent-first.
    ///
    /// No match yields an empty vec, never an error.
    pub async fn query(&self, query: &EntryQuery) -> Result<Vec<LogEntry>> {
        let level = match &query.level {
            Some(s) => Some(
                LogLevel::parse(s)
                    .ok_or_else(|| Error::Validation(format!("invalid level: {:?}", s)))?,
            ),
            None => None,
        };

        // Push the time bounds into the key range; the per-entry check below
        // settles sub-millisecond precision at the boundaries.
        let start_ms = query
            .since
            .map(|t| clamp_millis(t.timestamp_millis()))
            .unwrap_or(0);
        let end_ms = match query.until {
            Some(t) => clamp_millis(t.timestamp_millis()).saturating_add(1),
            None => u64::MAX,
        };

        let range = TimedKey::scan_range(RecordType::Entry, start_ms..end_ms);
        let mut iter = self.storage.scan_iter(range).await?;
        let mut matched = Vec::new();
        while let Some(record) = iter.next().await? {
            let entry: LogEntry = decode_document(&record.value)?;
            if let Some(want) = level {
                if entry.level != want {
                    continue;
                }
            }
            if let Some(want) = &query.request_id {
                if entry.request_id.as_deref() != Some(want.as_str()) {
                    continue;
                }
            }
            if let Some(since) = query.since {
                if entry.timestamp < since {
                    continue;
                }
            }
            if let Some(until) = query.until {
                if entry.timestamp >= until {
                    continue;
                }
            }
            matched.push(entry);
        }

        matched.reverse();
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(self.default_limit);
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }

    /// Deletes every entry with `timestamp < before` in one atomic batch.
    ///
    /// Returns the number of entries removed; pruning the same boundary
    /// again removes nothing.
    pub async fn prune(&self, before: DateTime<Utc>) -> Result<PruneResult> {
        let before_ms = clamp_millis(before.timestamp_millis());
        let range = TimedKey::scan_range(RecordType::Entry, 0..before_ms.saturating_add(1));

        let mut keys = Vec::new();
        let mut iter = self.storage.scan_iter(range).await?;
        while let Some(record) = iter.next().await? {
            let key = TimedKey::deserialize(RecordType::Entry, &record.key)?;
            if key.timestamp_ms < before_ms {
                keys.push(record.key);
                continue;
            }
            // Boundary millisecond: settle sub-millisecond precision from
            // the entry itself.
            let entry: LogEntry = decode_document(&record.value)?;
            if entry.timestamp < before {
                keys.push(record.key);
            }
        }
        drop(iter);

        let deleted = keys.len() as u64;
        if !keys.is_empty() {
            self.storage.delete(keys).await?;
        }
        Ok(PruneResult { deleted })
    }
}

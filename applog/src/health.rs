//! Health-check configuration and probe history for one app.
//!
//! The store keeps the configured URL list (replaced wholesale by set) and
//! an append-only history of probe outcomes. Probe execution itself happens
//! outside the store; an external prober records each outcome here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{Clock, Record, Storage};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::HealthCheckResult;
use crate::sequence::SequenceAllocator;
use crate::serde::{
    RecordType, TimedKey, clamp_millis, decode_document, encode_document, health_urls_key,
};

/// One probe outcome as submitted by the prober.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResultInput {
    pub url: String,
    pub ok: bool,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Time-bounded history filters; `since` inclusive, `until` exclusive.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Health-check state for one app.
pub struct HealthHistory {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    sequence: SequenceAllocator,
    default_limit: usize,
}

impl HealthHistory {
    pub async fn open(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        default_limit: usize,
    ) -> Result<Self> {
        let sequence = SequenceAllocator::open(&storage, RecordType::HealthSeq).await?;
        Ok(Self {
            storage,
            clock,
            sequence,
            default_limit,
        })
    }

    /// Replaces the configured URL list. An empty list disables checks.
    pub async fn set_urls(&self, urls: Vec<String>) -> Result<Vec<String>> {
        for url in &urls {
            if url.is_empty() {
                return Err(Error::Validation("url must not be empty".to_string()));
            }
        }
        self.storage
            .put(vec![Record::new(health_urls_key(), encode_document(&urls)?)])
            .await?;
        Ok(urls)
    }

    /// Returns the configured URL list; empty when never set.
    pub async fn urls(&self) -> Result<Vec<String>> {
        match self.storage.get(health_urls_key()).await? {
            Some(record) => decode_document(&record.value),
            None => Ok(Vec::new()),
        }
    }

    /// Appends one probe outcome to the history.
    pub async fn record_result(&mut self, input: HealthResultInput) -> Result<HealthCheckResult> {
        if input.url.is_empty() {
            return Err(Error::Validation("url must not be empty".to_string()));
        }
        let now: DateTime<Utc> = self.clock.now().into();
        let result = HealthCheckResult {
            url: input.url,
            ok: input.ok,
            status: input.status,
            timestamp: input.timestamp.unwrap_or(now),
        };

        let mut records = Vec::with_capacity(2);
        let delta = self.sequence.build_delta(1, &mut records);
        let key = TimedKey::new(
            RecordType::HealthResult,
            result.timestamp.timestamp_millis(),
            delta.base_sequence(),
        );
        records.push(Record::new(key.serialize(), encode_document(&result)?));

        self.storage.put(records).await?;
        self.sequence.apply_delta(delta);
        Ok(result)
    }

    /// Returns recorded probe outcomes, most-recent-first.
    pub async fn history(&self, query: &HistoryQuery) -> Result<Vec<HealthCheckResult>> {
        let start_ms = query
            .since
            .map(|t| clamp_millis(t.timestamp_millis()))
            .unwrap_or(0);
        let end_ms = match query.until {
            Some(t) => clamp_millis(t.timestamp_millis()).saturating_add(1),
            None => u64::MAX,
        };

        let range = TimedKey::scan_range(RecordType::HealthResult, start_ms..end_ms);
        let mut iter = self.storage.scan_iter(range).await?;
        let mut matched = Vec::new();
        while let Some(record) = iter.next().await? {
            let result: HealthCheckResult = decode_document(&record.value)?;
            if let Some(since) = query.since {
                if result.timestamp < since {
                    continue;
                }
            }
            if let Some(until) = query.until {
                if result.timestamp >= until {
                    continue;
                }
            }
            matched.push(result);
        }

        matched.reverse();
        let limit = query.limit.unwrap_or(self.default_limit);
        Ok(matched.into_iter().take(limit).collect())
    }
}

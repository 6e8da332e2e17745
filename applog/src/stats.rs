//! The stats aggregator: per-day, per-level counters for one app.
//!
//! Increments are plain read-modify-write sequences. They are safe without
//! locks because the owning app task never runs two operations at once;
//! the aggregator must not be invoked concurrently for the same app.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use common::{Clock, Record, Storage};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{DailyStat, LogLevel};
use crate::serde::{StatKey, decode_document, encode_document};

/// Upper bound on the `days` argument of [`StatsAggregator::get_range`].
pub const MAX_RANGE_DAYS: u32 = 365;

/// One increment as submitted by a caller.
#[derive(Debug, Clone, Deserialize)]
pub struct StatIncrement {
    /// Level whose counter to increment; must name a valid level.
    pub level: String,
    /// Amount to add; must be positive.
    pub count: u64,
}

/// Durable per-day counters for one app.
pub struct StatsAggregator {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    retention_days: u32,
}

impl StatsAggregator {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>, retention_days: u32) -> Self {
        Self {
            storage,
            clock,
            retention_days: retention_days.max(1),
        }
    }

    fn today(&self) -> NaiveDate {
        DateTime::<Utc>::from(self.clock.now()).date_naive()
    }

    /// Oldest date still within the retention window.
    fn retention_cutoff(&self, today: NaiveDate) -> Result<NaiveDate> {
        today
            .checked_sub_days(Days::new((self.retention_days - 1) as u64))
            .ok_or_else(|| Error::Validation("retention window out of date range".to_string()))
    }

    async fn load(&self, date: NaiveDate) -> Result<Option<DailyStat>> {
        match self
            .storage
            .get(StatKey::from_date(date).serialize())
            .await?
        {
            Some(record) => Ok(Some(decode_document(&record.value)?)),
            None => Ok(None),
        }
    }

    /// Adds `count` to one level's counter for today and returns the
    /// updated record.
    pub async fn increment_one(&self, increment: StatIncrement) -> Result<DailyStat> {
        self.increment_batch(vec![increment]).await
    }

    /// Applies all increments to today's record as one persisted update.
    ///
    /// Every increment is validated before the record is touched; a failure
    /// applies nothing.
    pub async fn increment_batch(&self, increments: Vec<StatIncrement>) -> Result<DailyStat> {
        if increments.is_empty() {
            return Err(Error::Validation(
                "counts must contain at least one increment".to_string(),
            ));
        }
        let mut parsed = Vec::with_capacity(increments.len());
        for increment in &increments {
            let level = LogLevel::parse(&increment.level).ok_or_else(|| {
                Error::Validation(format!("invalid level: {:?}", increment.level))
            })?;
            if increment.count == 0 {
                return Err(Error::Validation("count must be positive".to_string()));
            }
            parsed.push((level, increment.count));
        }

        let date = self.today();
        let mut stat = self
            .load(date)
            .await?
            .unwrap_or_else(|| DailyStat::zero(date));
        for (level, count) in parsed {
            stat.add(level, count);
        }
        self.storage
            .put(vec![Record::new(
                StatKey::from_date(date).serialize(),
                encode_document(&stat)?,
            )])
            .await?;

        self.expire(date).await?;
        Ok(stat)
    }

    /// Deletes stat records that have aged out of the retention window.
    async fn expire(&self, today: NaiveDate) -> Result<()> {
        let cutoff = StatKey::from_date(self.retention_cutoff(today)?);
        if cutoff.day == 0 {
            return Ok(());
        }

        let mut expired = Vec::new();
        let mut iter = self
            .storage
            .scan_iter(StatKey::scan_range(0..cutoff.day))
            .await?;
        while let Some(record) = iter.next().await? {
            expired.push(record.key);
        }
        drop(iter);

        if !expired.is_empty() {
            self.storage.delete(expired).await?;
        }
        Ok(())
    }

    /// Returns exactly `days` records, one per calendar date backward from
    /// today inclusive, most-recent-first.
    ///
    /// Dates with no stored record (including expired ones) are synthesized
    /// as zero-valued records, so callers always receive a dense,
    /// fixed-length series.
    pub async fn get_range(&self, days: u32) -> Result<Vec<DailyStat>> {
        if days == 0 || days > MAX_RANGE_DAYS {
            return Err(Error::Validation(format!(
                "days must be between 1 and {}",
                MAX_RANGE_DAYS
            )));
        }

        let today = self.today();
        let cutoff = self.retention_cutoff(today)?;
        let mut stats = Vec::with_capacity(days as usize);
        for offset in 0..days {
            let date = today
                .checked_sub_days(Days::new(offset as u64))
                .ok_or_else(|| Error::Validation("date range out of bounds".to_string()))?;
            let stat = if date < cutoff {
                // Aged-out records read the same as never written.
                DailyStat::zero(date)
            } else {
                self.load(date).await?.unwrap_or_else(|| DailyStat::zero(date))
            };
            stats.push(stat);
        }
        Ok(stats)
    }
}

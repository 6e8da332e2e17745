//! The app store: the single addressable unit owning one app's state.
//!
//! An `AppStore` holds the entry store, the stats aggregator, and the
//! health history for exactly one app, and executes protocol requests
//! against them. It holds no transactional state of its own; serialization
//! of operations comes from the owning task (see [`registry`]).
//!
//! [`registry`]: crate::registry

use std::sync::Arc;

use common::{Clock, Storage};

use crate::config::Config;
use crate::entries::EntryStore;
use crate::error::{Error, Result};
use crate::health::HealthHistory;
use crate::protocol::{Envelope, Operation, Request};
use crate::stats::StatsAggregator;

/// All durable state for one app.
pub struct AppStore {
    entries: EntryStore,
    stats: StatsAggregator,
    health: HealthHistory,
}

impl AppStore {
    /// Opens the store over the app's isolated storage namespace.
    pub async fn open(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Result<Self> {
        let entries = EntryStore::open(
            storage.clone(),
            clock.clone(),
            config.default_query_limit,
        )
        .await?;
        let stats = StatsAggregator::new(storage.clone(), clock.clone(), config.stats_retention_days);
        let health = HealthHistory::open(storage, clock, config.default_query_limit).await?;
        Ok(Self {
            entries,
            stats,
            health,
        })
    }

    /// Executes one request and returns its envelope.
    ///
    /// Storage faults and all other errors come back as structured error
    /// envelopes; nothing escapes as an uncaught fault.
    pub async fn execute(&mut self, request: Request) -> Envelope {
        let operation = match Operation::parse(request) {
            Ok(operation) => operation,
            Err(err) => return Envelope::from_error(&err),
        };
        match self.apply(operation).await {
            Ok(data) => Envelope::Success { data },
            Err(err) => Envelope::from_error(&err),
        }
    }

    async fn apply(&mut self, operation: Operation) -> Result<serde_json::Value> {
        match operation {
            Operation::AppendOne(input) => to_value(&self.entries.append(input).await?),
            Operation::AppendBatch(inputs) => to_value(&self.entries.append_batch(inputs).await?),
            Operation::Query(query) => to_value(&self.entries.query(&query).await?),
            Operation::Increment(counts) => to_value(&self.stats.increment_batch(counts).await?),
            Operation::StatsRange { days } => to_value(&self.stats.get_range(days).await?),
            Operation::Prune { before } => to_value(&self.entries.prune(before).await?),
            Operation::SetHealthUrls { urls } => {
                let urls = self.health.set_urls(urls).await?;
                to_value(&serde_json::json!({ "urls": urls }))
            }
            Operation::GetHealthUrls => {
                let urls = self.health.urls().await?;
                to_value(&serde_json::json!({ "urls": urls }))
            }
            Operation::RecordHealth(input) => to_value(&self.health.record_result(input).await?),
            Operation::HealthHistory(query) => to_value(&self.health.history(&query).await?),
        }
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| Error::Encoding(e.to_string()))
}

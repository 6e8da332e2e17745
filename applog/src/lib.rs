//! applog - a multi-tenant log-ingestion and query service.
//!
//! Registered apps push structured log entries and read them back with
//! filters; the service also keeps per-day aggregate counters and
//! health-check history per app.
//!
//! # Architecture
//!
//! Every app identifier maps to exactly one [`AppStore`] owning that app's
//! durable state: an entry store, a stats aggregator, and a health history,
//! all over a private storage namespace. The [`StoreRegistry`] materializes
//! one single-writer task per app, so all operations against one app are
//! serialized while different apps run fully in parallel. The service
//! façade (feature `http-server`) resolves the app identifier from the URL
//! and forwards protocol [`Request`]s to the app's handle.
//!
//! # Example
//!
//! ```ignore
//! use applog::{Config, Request, StoreRegistry};
//! use serde_json::json;
//!
//! let registry = StoreRegistry::new(Config::default());
//! let handle = registry.handle("orders").await?;
//!
//! // Append an entry
//! let envelope = handle
//!     .dispatch(Request::post("/log", json!({"level": "INFO", "message": "hi"})))
//!     .await;
//!
//! // Read recent entries, most recent first
//! let envelope = handle.dispatch(Request::get("/logs")).await;
//! ```

mod apps;
mod config;
mod entries;
mod error;
mod health;
mod model;
mod protocol;
mod registry;
mod sequence;
mod serde;
mod stats;
mod store;

#[cfg(feature = "http-server")]
pub mod server;

pub use apps::{AppDirectory, AppRecord};
pub use config::Config;
pub use entries::{EntryInput, EntryQuery, EntryStore};
pub use error::{Error, Result};
pub use health::{HealthHistory, HealthResultInput, HistoryQuery};
pub use model::{DailyStat, HealthCheckResult, LogEntry, LogLevel, PruneResult};
pub use protocol::{Envelope, ErrorCode, Method, Operation, Request};
pub use registry::{AppHandle, StoreRegistry};
pub use stats::{StatIncrement, StatsAggregator};
pub use store::AppStore;

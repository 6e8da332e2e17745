//! HTTP façade for the log service.
//!
//! Thin request/response plumbing over the core: handlers resolve the app
//! identifier from the URL, forward the call to the app's single-writer
//! handle, and map the resulting envelope onto the fixed HTTP status table.

mod config;
mod handlers;
mod http;
mod metrics;

pub use config::{CliArgs, ServerConfig};
pub use http::AppServer;
pub use metrics::Metrics;

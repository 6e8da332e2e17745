//! Name-addressed registry of per-app single-writer tasks.
//!
//! Every app identifier maps to exactly one running task that owns that
//! app's [`AppStore`]. The task processes commands from a bounded queue
//! strictly one at a time, fully awaiting each operation before dequeueing
//! the next, so read-modify-write sequences for one app never interleave.
//! Different apps run fully in parallel with no shared mutable state.
//!
//! Handles are cheap to clone. A full queue reports backpressure as a
//! SERVICE_UNAVAILABLE envelope rather than waiting.

use std::collections::HashMap;
use std::sync::Arc;

use common::clock::SystemClock;
use common::storage::factory::create_storage;
use common::Clock;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::protocol::{Envelope, ErrorCode, Request};
use crate::store::AppStore;

/// Longest accepted app identifier.
const MAX_APP_ID_LEN: usize = 128;

struct Command {
    request: Request,
    respond: oneshot::Sender<Envelope>,
}

/// Handle for dispatching requests to one app's task.
#[derive(Clone)]
pub struct AppHandle {
    cmd_tx: mpsc::Sender<Command>,
}

impl AppHandle {
    /// Sends one request to the app's task and awaits its envelope.
    ///
    /// Operations are admitted in call order and take effect in that order.
    pub async fn dispatch(&self, request: Request) -> Envelope {
        let (respond, response_rx) = oneshot::channel();
        if let Err(err) = self.cmd_tx.try_send(Command { request, respond }) {
            return match err {
                mpsc::error::TrySendError::Full(_) => Envelope::error(
                    ErrorCode::ServiceUnavailable,
                    "app store queue is full, backpressure applied",
                ),
                mpsc::error::TrySendError::Closed(_) => Envelope::error(
                    ErrorCode::ServiceUnavailable,
                    "app store has shut down",
                ),
            };
        }
        match response_rx.await {
            Ok(envelope) => envelope,
            Err(_) => Envelope::error(
                ErrorCode::ServiceUnavailable,
                "app store stopped before responding",
            ),
        }
    }
}

struct AppSlot {
    handle: AppHandle,
    task: Option<JoinHandle<()>>,
}

/// Registry mapping app identifiers to their single-writer tasks.
///
/// The same identifier always resolves to the same running instance;
/// instances are materialized lazily on first use.
pub struct StoreRegistry {
    apps: tokio::sync::Mutex<HashMap<String, AppSlot>>,
    config: Config,
    clock: Arc<dyn Clock>,
    stop: CancellationToken,
}

impl StoreRegistry {
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a registry with an injected clock, for tests.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            apps: tokio::sync::Mutex::new(HashMap::new()),
            config,
            clock,
            stop: CancellationToken::new(),
        }
    }

    /// Returns the handle for `app`, creating its store and task on first
    /// use.
    pub async fn handle(&self, app: &str) -> Result<AppHandle> {
        validate_app_id(app)?;

        let mut apps = self.apps.lock().await;
        if let Some(slot) = apps.get(app) {
            return Ok(slot.handle.clone());
        }

        // Each app gets a private storage namespace under apps/.
        let storage_config = self.config.storage.scoped(&format!("apps/{}", app));
        let storage = create_storage(&storage_config).await.map_err(Error::from)?;
        let store = AppStore::open(storage, self.clock.clone(), &self.config).await?;

        let (cmd_tx, cmd_rx) = mpsc::channel(self.config.queue_capacity);
        let task = tokio::spawn(run_app(store, cmd_rx, self.stop.child_token()));
        let handle = AppHandle { cmd_tx };
        apps.insert(
            app.to_string(),
            AppSlot {
                handle: handle.clone(),
                task: Some(task),
            },
        );

        tracing::debug!(app, "materialized app store");
        Ok(handle)
    }

    /// Stops every app task and waits for them to finish.
    ///
    /// Commands already admitted are still executed before a task exits.
    pub async fn shutdown(&self) {
        self.stop.cancel();
        let mut apps = self.apps.lock().await;
        for (app, slot) in apps.iter_mut() {
            if let Some(task) = slot.task.take() {
                if task.await.is_err() {
                    tracing::warn!(app, "app store task panicked during shutdown");
                }
            }
        }
    }
}

/// Event loop owning one app's store.
async fn run_app(
    mut store: AppStore,
    mut cmd_rx: mpsc::Receiver<Command>,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => {
                        let envelope = store.execute(cmd.request).await;
                        // Ignore send errors: the caller may have gone away.
                        let _ = cmd.respond.send(envelope);
                    }
                    None => break,
                }
            }
            _ = stop.cancelled() => break,
        }
    }

    // Drain commands admitted before the stop signal.
    while let Ok(cmd) = cmd_rx.try_recv() {
        let envelope = store.execute(cmd.request).await;
        let _ = cmd.respond.send(envelope);
    }
}

fn validate_app_id(app: &str) -> Result<()> {
    if app.is_empty() {
        return Err(Error::Validation("app identifier must not be empty".to_string()));
    }
    if app.len() > MAX_APP_ID_LEN {
        return Err(Error::Validation(format!(
            "app identifier must be at most {} characters",
            MAX_APP_ID_LEN
        )));
    }
    if !app
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(Error::Validation(
            "app identifier may only contain letters, digits, '-', '_' and '.'".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use common::storage::config::StorageConfig;
    use serde_json::json;

    use super::*;

    fn test_config() -> Config {
        Config {
            storage: StorageConfig::InMemory,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn should_resolve_same_identifier_to_same_instance() {
        // given
        let registry = StoreRegistry::new(test_config());

        // when - write through one handle, read through another
        let first = registry.handle("orders").await.unwrap();
        first
            .dispatch(Request::post(
                "/log",
                json!({"level": "INFO", "message": "hello"}),
            ))
            .await;

        let second = registry.handle("orders").await.unwrap();
        let envelope = second.dispatch(Request::get("/logs")).await;

        // then
        let data = envelope.data().unwrap().as_array().unwrap().clone();
        assert_eq!(data.len(), 1);
    }

    #[tokio::test]
    async fn should_isolate_apps_from_each_other() {
        // given
        let registry = StoreRegistry::new(test_config());
        let orders = registry.handle("orders").await.unwrap();
        let billing = registry.handle("billing").await.unwrap();

        // when
        orders
            .dispatch(Request::post(
                "/log",
                json!({"level": "INFO", "message": "orders only"}),
            ))
            .await;

        // then
        let envelope = billing.dispatch(Request::get("/logs")).await;
        assert!(envelope.data().unwrap().as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_reject_invalid_app_identifier() {
        // given
        let registry = StoreRegistry::new(test_config());

        // when/then
        assert!(matches!(
            registry.handle("").await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            registry.handle("bad/name").await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            registry.handle(&"x".repeat(200)).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn should_not_lose_concurrent_stat_increments() {
        // given
        let registry = Arc::new(StoreRegistry::new(test_config()));
        let handle = registry.handle("concurrent").await.unwrap();

        // when - ten concurrent single increments against the same app
        let mut tasks = Vec::new();
        for _ in 0..10 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle
                    .dispatch(Request::post("/stats", json!({"level": "INFO"})))
                    .await
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_success());
        }

        // then - no lost updates
        let envelope = handle
            .dispatch(Request::get("/stats").with_query("days", "1"))
            .await;
        let data = envelope.data().unwrap().as_array().unwrap().clone();
        assert_eq!(data[0]["info"], 10);
    }

    #[tokio::test]
    async fn should_report_backpressure_when_queue_is_full() {
        // given - a handle with a single-slot queue and no consumer
        let (cmd_tx, _cmd_rx) = mpsc::channel(1);
        let handle = AppHandle { cmd_tx };

        // when - the first dispatch fills the queue and stays pending
        let first = handle.clone();
        let pending = tokio::spawn(async move {
            first
                .dispatch(Request::post("/stats", json!({"level": "INFO"})))
                .await
        });
        tokio::task::yield_now().await;
        let envelope = handle
            .dispatch(Request::post("/stats", json!({"level": "INFO"})))
            .await;

        // then - the overflowing dispatch reports backpressure
        match envelope {
            Envelope::Error { code, .. } => {
                assert_eq!(code, ErrorCode::ServiceUnavailable);
            }
            Envelope::Success { .. } => panic!("expected backpressure"),
        }
        pending.abort();
    }

    #[tokio::test]
    async fn should_answer_with_shutdown_envelope_after_shutdown() {
        // given
        let registry = StoreRegistry::new(test_config());
        let handle = registry.handle("app").await.unwrap();

        // when
        registry.shutdown().await;
        let envelope = handle.dispatch(Request::get("/logs")).await;

        // then
        match envelope {
            Envelope::Error { code, .. } => assert_eq!(code, ErrorCode::ServiceUnavailable),
            Envelope::Success { .. } => panic!("expected shutdown error"),
        }
    }
}

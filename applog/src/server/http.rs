//! HTTP server for the log service.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use tokio::signal;

use super::config::ServerConfig;
use super::handlers::{
    AppState, append_log, append_logs, create_app, delete_app, get_health_urls, handle_healthy,
    handle_metrics, handle_ready, health_history, increment_stats, list_apps, prune_logs,
    query_logs, record_health, set_health_urls, stats_range,
};
use super::metrics::Metrics;
use crate::apps::AppDirectory;
use crate::registry::StoreRegistry;

/// HTTP server for the log service.
pub struct AppServer {
    registry: Arc<StoreRegistry>,
    directory: Arc<AppDirectory>,
    config: ServerConfig,
}

impl AppServer {
    /// Create a new server over the registry and app directory.
    pub fn new(
        registry: Arc<StoreRegistry>,
        directory: Arc<AppDirectory>,
        config: ServerConfig,
    ) -> Self {
        Self {
            registry,
            directory,
            config,
        }
    }

    /// Run the HTTP server until SIGINT/SIGTERM.
    pub async fn run(self) {
        let metrics = Arc::new(Metrics::new());
        let state = AppState {
            registry: self.registry.clone(),
            directory: self.directory,
            metrics,
        };

        let app = Router::new()
            .route("/api/v1/apps", post(create_app).get(list_apps))
            .route("/api/v1/apps/{app}", delete(delete_app))
            .route("/api/v1/apps/{app}/log", post(append_log))
            .route("/api/v1/apps/{app}/logs", post(append_logs).get(query_logs))
            .route(
                "/api/v1/apps/{app}/stats",
                post(increment_stats).get(stats_range),
            )
            .route("/api/v1/apps/{app}/prune", post(prune_logs))
            .route(
                "/api/v1/apps/{app}/health-urls",
                post(set_health_urls).get(get_health_urls),
            )
            .route(
                "/api/v1/apps/{app}/health",
                post(record_health).get(health_history),
            )
            .route("/metrics", get(handle_metrics))
            .route("/-/healthy", get(handle_healthy))
            .route("/-/ready", get(handle_ready))
            .with_state(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        tracing::info!("Starting applog HTTP server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("failed to bind listener");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .expect("server error");

        // Stop app tasks after the listener closes so admitted operations
        // still complete.
        self.registry.shutdown().await;
        tracing::info!("Server shut down gracefully");
    }
}

/// Listen for SIGTERM (pod termination) and SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}

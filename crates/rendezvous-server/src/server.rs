//! `SignalServer`: Axum HTTP + WebSocket front end for the coordinator task.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use rendezvous_core::PeerId;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::errors::Result;
use crate::health::{self, HealthResponse, LIVENESS_MESSAGE};
use crate::hub::{Hub, HubHandle};
use crate::metrics::WS_CONNECTIONS_REJECTED_TOTAL;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::registry::PeerRegistry;
use crate::websocket::session::{SessionContext, run_peer_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Live connections.
    pub registry: Arc<PeerRegistry>,
    /// Coordinator task.
    pub hub: HubHandle,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
    /// One permit per allowed connection, held for the session's lifetime.
    pub connection_slots: Arc<Semaphore>,
}

/// The signaling server.
pub struct SignalServer {
    config: Arc<ServerConfig>,
    registry: Arc<PeerRegistry>,
    hub: HubHandle,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
    connection_slots: Arc<Semaphore>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SignalServer {
    /// Validate `config`, then create a server and start its coordinator task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let registry = Arc::new(PeerRegistry::new());
        let (hub, handle) = Hub::new(registry.clone(), config.hub_queue_capacity);
        let hub_task = hub.spawn(shutdown.token());

        Ok(Self {
            connection_slots: Arc::new(Semaphore::new(config.max_connections)),
            config: Arc::new(config),
            registry,
            hub: handle,
            shutdown,
            start_time: Instant::now(),
            metrics: None,
            tasks: Mutex::new(vec![hub_task]),
        })
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            config: self.config.clone(),
            registry: self.registry.clone(),
            hub: self.hub.clone(),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
            connection_slots: self.connection_slots.clone(),
        };

        Router::new()
            .route("/", get(liveness_handler))
            .route("/health", get(health_handler))
            .route("/ws", get(ws_handler))
            .route("/metrics", get(metrics_handler))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve in the background.
    ///
    /// Returns the bound address (useful with port 0). Serving stops when
    /// shutdown is initiated.
    pub async fn listen(&self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "http server failed");
            }
        });
        self.tasks.lock().push(handle);

        info!(%addr, "signaling server listening");
        Ok(addr)
    }

    /// Stop accepting connections, end every session and the coordinator
    /// task, waiting at most the configured shutdown timeout.
    pub async fn shutdown_gracefully(&self) {
        let handles = std::mem::take(&mut *self.tasks.lock());
        self.shutdown
            .graceful_shutdown(handles, self.config.shutdown_timeout())
            .await;
        info!("signaling server stopped");
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the connection registry.
    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    /// Get the coordinator handle.
    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }
}

/// GET /
async fn liveness_handler() -> &'static str {
    LIVENESS_MESSAGE
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.registry.connection_count().await;
    let stats = state.hub.stats().await.unwrap_or_default();
    Json(health::health_check(state.start_time, connections, stats))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => crate::metrics::render(&handle).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.shutdown.is_shutting_down() {
        counter!(WS_CONNECTIONS_REJECTED_TOTAL, "reason" => "shutdown").increment(1);
        return (StatusCode::SERVICE_UNAVAILABLE, "server is shutting down").into_response();
    }
    let Ok(slot) = state.connection_slots.clone().try_acquire_owned() else {
        counter!(WS_CONNECTIONS_REJECTED_TOTAL, "reason" => "limit").increment(1);
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    };

    let peer = PeerId::new();
    let ctx = SessionContext {
        hub: state.hub.clone(),
        registry: state.registry.clone(),
        cancel: state.shutdown.token(),
        send_queue_capacity: state.config.send_queue_capacity,
        heartbeat_interval: state.config.heartbeat_interval(),
        heartbeat_timeout: state.config.heartbeat_timeout(),
    };
    let shutdown = state.shutdown.clone();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            shutdown.track(async move {
                run_peer_session(socket, peer, ctx).await;
                drop(slot);
            })
        })
}

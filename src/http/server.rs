//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, request ID, CORS, timeout)
//! - Serve on a listener until the shutdown broadcast fires

use arc_swap::ArcSwap;
use axum::{
    http::HeaderName,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::CacheStore;
use crate::config::CacherConfig;
use crate::events::EventBroadcaster;
use crate::fetcher::{FetchStats, RateLimiterView};
use crate::health::HealthTracker;
use crate::http::{handlers, sse};
use crate::lifecycle::Shutdown;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Deadline for ordinary (non-streaming) handlers.
const HANDLER_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers. Every field is a read-only
/// snapshot source except `config_tx`, which forwards updates to the scheduler,
/// and `shutdown`, which ends open event streams.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<CacherConfig>>,
    pub cache: Arc<CacheStore>,
    pub health: Arc<HealthTracker>,
    pub events: EventBroadcaster,
    pub stats: Arc<FetchStats>,
    pub limiter: RateLimiterView,
    pub config_tx: mpsc::UnboundedSender<CacherConfig>,
    pub shutdown: Shutdown,
    pub started_at: DateTime<Utc>,
}

/// HTTP server for the local query API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/", get(handlers::root))
            .route("/data", get(handlers::get_data))
            .route("/backup", get(handlers::get_backup))
            .route("/status", get(handlers::get_status))
            .route("/status/connection", get(handlers::get_connection_status))
            .route("/config", get(handlers::get_config).post(handlers::update_config))
            .route("/events", get(sse::events))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(request_id))
                    .layer(CorsLayer::permissive())
                    .layer(TimeoutLayer::new(HANDLER_TIMEOUT)),
            )
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID)
//! - Bind server to listener
//! - Shut down gracefully on signal
//!
//! # Design Decisions
//! - One router serves both surfaces: the webhook ingest paths and the
//!   query API
//! - The body limit sits innermost of the infrastructure layers so a
//!   rejected oversized body is still traced and correlatable

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::{
    contact, delete_event, delete_events, fetch_event, list_events, stats,
};
use crate::config::GatewayConfig;
use crate::http::request::{request_id, MakeRequestUuid};
use crate::storage::{EventStore, Forwarder, StorageHandles};
use crate::webhook::handlers::{receive, receive_scoped};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
    /// Present only when the primary backend is queryable.
    pub store: Option<Arc<dyn EventStore>>,
}

/// HTTP server for the webhook gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and storage.
    pub fn new(config: &GatewayConfig, handles: StorageHandles) -> Self {
        let forwarder = Arc::new(Forwarder::new(handles.primary, handles.mirrors));
        tracing::info!(
            primary = forwarder.primary_name(),
            queryable = handles.store.is_some(),
            "Storage adapters wired"
        );

        let state = AppState {
            forwarder,
            store: handles.store,
        };

        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(health))
            // Ingest aliases kept from earlier deployments; all feed the
            // same pipeline.
            .route("/webhook", post(receive))
            .route("/webhook/waspeed", post(receive))
            .route("/webhook/crm", post(receive))
            .route("/webhook/mensagens", post(receive))
            .route("/webhook/{instance}/{channel}", post(receive_scoped))
            .route("/api/webhooks", get(list_events).delete(delete_events))
            .route("/api/webhooks/{id}", get(fetch_event).delete(delete_event))
            .route("/api/estatisticas", get(stats))
            .route("/api/contatos/{number}", get(contact))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.ingest.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %req.method(),
                        path = %req.uri().path(),
                        request_id = %request_id(req.headers()),
                    )
                }),
            )
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

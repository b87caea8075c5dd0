//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the inference and diagnostics handlers
//! - Wire up middleware (tracing, idle timeout, body limit, request ID)
//! - Bind server to listener and shut down on signal

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ConfigError, CredentialSource, OperatingMode, ProxyConfig};
use crate::health::{ProxyStats, StatsSnapshot};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::not_found;
use crate::http::upstream::UpstreamForwarder;
use crate::lifecycle::signals::shutdown_signal;
use crate::routing::{Failover, RouteTable};

/// Errors building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub failover: Arc<Failover>,
    pub started: Instant,
}

/// Document served by the diagnostics endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDocument {
    pub status: &'static str,
    pub mode: OperatingMode,
    pub uptime_secs: u64,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

/// The local failover proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    stats: Arc<ProxyStats>,
}

impl HttpServer {
    /// Create a new server. Credentials are consulted per request, not here.
    pub fn new(config: ProxyConfig, credentials: Arc<dyn CredentialSource>) -> Result<Self, ServerError> {
        let routes = RouteTable::from_config(&config.upstream)?;
        let forwarder = UpstreamForwarder::new(&config.timeouts)?;
        let stats = Arc::new(ProxyStats::new());

        for route in routes.available(OperatingMode::Dual) {
            tracing::info!(provider = %route.provider, endpoint = %route.endpoint, "Upstream route");
        }

        let state = AppState {
            failover: Arc::new(Failover::new(routes, forwarder, credentials, stats.clone())),
            started: Instant::now(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            stats,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route(
                &config.listener.inference_path,
                post(inference_handler).fallback(not_found),
            )
            .route(&config.listener.health_path, get(health_handler).fallback(not_found))
            .fallback(not_found)
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.idle_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server until a signal arrives or `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            inference_path = %self.config.listener.inference_path,
            health_path = %self.config.listener.health_path,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_signal() => {}
                    _ = shutdown.recv() => {}
                }
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn stats(&self) -> Arc<ProxyStats> {
        self.stats.clone()
    }
}

async fn inference_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let request_id = request_id(&headers).to_string();
    tracing::debug!(request_id = %request_id, bytes = body.len(), "Inference request");
    state.failover.handle(&request_id, &headers, body).await
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthDocument> {
    Json(HealthDocument {
        status: "ok",
        mode: state.failover.current_mode(),
        uptime_secs: state.started.elapsed().as_secs(),
        stats: state.failover.stats().snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticCredentials;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn server(credentials: StaticCredentials) -> HttpServer {
        HttpServer::new(ProxyConfig::default(), Arc::new(credentials)).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_mode_and_counters() {
        let server = server(StaticCredentials::new(Some("t"), None));
        let res = server
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["mode"], "primary-only");
        assert_eq!(json["requests"], 0);
        assert!(json["lastError"].is_null());
    }

    #[tokio::test]
    async fn test_unavailable_mode_rejects() {
        let server = server(StaticCredentials::default());
        let res = server
            .router()
            .oneshot(Request::post("/v1/messages").body(Body::from("{}")).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let snap = server.stats().snapshot();
        assert_eq!(snap.requests, 1);
        assert_eq!(snap.failures, 1);
    }

    #[tokio::test]
    async fn test_not_found_paths() {
        let server = server(StaticCredentials::new(Some("t"), Some("k")));
        for request in [
            Request::get("/v1/messages").body(Body::empty()).unwrap(),
            Request::put("/v1/messages").body(Body::empty()).unwrap(),
            Request::post("/v1/other").body(Body::empty()).unwrap(),
            Request::get("/").body(Body::empty()).unwrap(),
        ] {
            let res = server.router().oneshot(request).await.unwrap();
            assert_eq!(res.status(), StatusCode::NOT_FOUND);
        }
        assert_eq!(server.stats().snapshot().requests, 0);
    }

    #[tokio::test]
    async fn test_request_id_is_preserved() {
        let server = server(StaticCredentials::new(Some("t"), None));
        let res = server
            .router()
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.headers()["x-request-id"], "req-42");
    }
}

//! Per-request failover state machine.
//!
//! ```text
//! Start (requests += 1)
//!   → for each route available in the current OperatingMode, in priority order:
//!       transport error  → remember error, next route
//!       non-2xx          → remember status + body, next route
//!       2xx              → Done(success), stream response
//!   → no route left      → Done(failure), 500 with every provider's error
//! ```
//!
//! Exactly one attempt per provider; no backoff, no delay between attempts.

use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::config::{resolve, CredentialSource, OperatingMode};
use crate::health::ProxyStats;
use crate::http::response::{FailureDocument, UnavailableDocument};
use crate::http::upstream::{forwarded_headers, UpstreamForwarder, UpstreamRequest};
use crate::observability::metrics;
use crate::routing::{Provider, RouteTable};

/// Drives one inbound request through the provider routes.
pub struct Failover {
    routes: RouteTable,
    forwarder: UpstreamForwarder,
    credentials: Arc<dyn CredentialSource>,
    stats: Arc<ProxyStats>,
}

impl Failover {
    pub fn new(
        routes: RouteTable,
        forwarder: UpstreamForwarder,
        credentials: Arc<dyn CredentialSource>,
        stats: Arc<ProxyStats>,
    ) -> Self {
        Self {
            routes,
            forwarder,
            credentials,
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<ProxyStats> {
        &self.stats
    }

    /// Mode implied by the credentials visible right now.
    pub fn current_mode(&self) -> OperatingMode {
        resolve(&self.credentials.load())
    }

    /// Handle one inference request.
    pub async fn handle(&self, request_id: &str, headers: &HeaderMap, body: Bytes) -> Response {
        let record = self.stats.begin();
        let credentials = self.credentials.load();
        let mode = resolve(&credentials);

        if mode == OperatingMode::Unavailable {
            tracing::warn!(request_id = %request_id, "Rejecting request: no upstream credentials");
            record.fail("no upstream providers configured");
            metrics::record_request(None, "unavailable");
            return UnavailableDocument {
                error: "No upstream providers configured".to_string(),
                mode,
                stats: self.stats.snapshot(),
            }
            .into_response();
        }

        let forwarded = forwarded_headers(headers);
        let mut errors: Vec<(Provider, String)> = Vec::new();

        for route in self.routes.available(mode) {
            let provider = route.provider;
            let Some(secret) = credentials.secret_for(provider) else {
                continue;
            };
            let request = UpstreamRequest::new(body.clone(), forwarded.clone());

            let message = match self.forwarder.forward(route, secret, &request).await {
                Ok(response) if response.status().is_success() => {
                    if errors.is_empty() {
                        tracing::debug!(request_id = %request_id, provider = %provider, "Request served");
                    } else {
                        tracing::info!(
                            request_id = %request_id,
                            provider = %provider,
                            failed = errors.len(),
                            "Request served after failover"
                        );
                    }
                    record.succeed(provider);
                    metrics::record_request(Some(provider), "success");
                    return response.into_response();
                }
                Ok(response) => {
                    let status = response.status();
                    let text = response.error_text().await;
                    tracing::warn!(
                        request_id = %request_id,
                        provider = %provider,
                        status = %status,
                        "Upstream returned error, failing over"
                    );
                    text
                }
                Err(e) => {
                    tracing::warn!(
                        request_id = %request_id,
                        provider = %provider,
                        error = %e,
                        "Upstream unreachable, failing over"
                    );
                    e.to_string()
                }
            };

            self.stats.set_last_error(format!("{}: {}", provider, message));
            errors.push((provider, message));
        }

        let error_for = |p: Provider| {
            errors
                .iter()
                .find(|(provider, _)| *provider == p)
                .map(|(_, message)| message.clone())
        };
        let bedrock_error = error_for(Provider::Bedrock);
        let anthropic_error = error_for(Provider::Anthropic);

        let summary = errors
            .iter()
            .map(|(p, m)| format!("{}: {}", p, m))
            .collect::<Vec<_>>()
            .join("; ");
        tracing::error!(request_id = %request_id, mode = %mode, errors = %summary, "All providers failed");

        record.fail(summary);
        metrics::record_request(None, "failure");

        FailureDocument {
            error: "All providers failed".to_string(),
            bedrock_error,
            anthropic_error,
            stats: self.stats.snapshot(),
        }
        .into_response()
    }
}

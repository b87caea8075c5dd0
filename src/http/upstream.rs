//! Upstream forwarding.
//!
//! # Responsibilities
//! - Build the provider-specific request (endpoint, auth scheme)
//! - Send it and hand back status, headers and a streaming body untouched
//! - Distinguish transport failures from HTTP error responses
//!
//! # Design Decisions
//! - Stateless apart from the shared connection pool
//! - A non-2xx response is a normal result, not an error
//! - No overall timeout; the listener's idle timeout bounds a hung call

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::TimeoutConfig;
use crate::http::response::strip_hop_by_hop;
use crate::observability::metrics;
use crate::routing::{Provider, Route};

/// Protocol-version header carried through to the providers.
pub const ANTHROPIC_VERSION: HeaderName = HeaderName::from_static("anthropic-version");
/// Optional feature-flag header, forwarded when present.
pub const ANTHROPIC_BETA: HeaderName = HeaderName::from_static("anthropic-beta");
/// Value used when the client does not send `anthropic-version`.
pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

const API_KEY: HeaderName = HeaderName::from_static("x-api-key");
const MAX_ERROR_BODY: usize = 4096;

/// Network-level failure reaching an upstream.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

/// A request prepared for one provider.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub body: Bytes,
    pub headers: HeaderMap,
}

impl UpstreamRequest {
    pub fn new(body: Bytes, headers: HeaderMap) -> Self {
        Self { body, headers }
    }
}

/// Select the inbound headers that are forwarded, defaulting the protocol version.
pub fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let version = inbound
        .get(&ANTHROPIC_VERSION)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ANTHROPIC_VERSION));
    headers.insert(ANTHROPIC_VERSION, version);
    if let Some(beta) = inbound.get(&ANTHROPIC_BETA) {
        headers.insert(ANTHROPIC_BETA, beta.clone());
    }
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// A provider's answer, body not yet consumed.
#[derive(Debug)]
pub struct UpstreamResponse {
    inner: reqwest::Response,
}

impl UpstreamResponse {
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Convert into a client response, streaming the body through.
    pub fn into_response(self) -> Response {
        let status = self.inner.status();
        let mut headers = self.inner.headers().clone();
        strip_hop_by_hop(&mut headers);

        let mut response = Response::new(Body::from_stream(self.inner.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }

    /// Consume the body as diagnostic text. Reading stops at `MAX_ERROR_BODY`.
    pub async fn error_text(mut self) -> String {
        let status = self.inner.status();
        let mut body = Vec::new();
        let mut truncated = false;

        loop {
            match self.inner.chunk().await {
                Ok(Some(chunk)) => {
                    let room = MAX_ERROR_BODY - body.len();
                    if chunk.len() > room {
                        body.extend_from_slice(&chunk[..room]);
                        truncated = true;
                        break;
                    }
                    body.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) if body.is_empty() => {
                    return format!("HTTP {}: <unreadable body: {}>", status.as_u16(), e);
                }
                Err(_) => {
                    truncated = true;
                    break;
                }
            }
        }

        format!("HTTP {}: {}", status.as_u16(), decode_capped(&body, truncated))
    }
}

/// Decode a possibly cut body, dropping a trailing partial character.
fn decode_capped(bytes: &[u8], truncated: bool) -> String {
    if !truncated {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    let end = match std::str::from_utf8(bytes) {
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        _ => bytes.len(),
    };
    let mut text = String::from_utf8_lossy(&bytes[..end]).into_owned();
    text.push_str("...");
    text
}

/// Sends prepared requests to provider endpoints.
#[derive(Debug, Clone)]
pub struct UpstreamForwarder {
    client: reqwest::Client,
}

impl UpstreamForwarder {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }

    /// Send `request` to `route`, authenticating with `secret`.
    pub async fn forward(
        &self,
        route: &Route,
        secret: &str,
        request: &UpstreamRequest,
    ) -> Result<UpstreamResponse, ForwardError> {
        let provider = route.provider;
        let builder = self
            .client
            .post(route.endpoint.clone())
            .headers(request.headers.clone());
        let builder = match provider {
            Provider::Bedrock => builder.bearer_auth(secret),
            Provider::Anthropic => builder.header(API_KEY, secret),
        };

        let start = Instant::now();
        let result = builder.body(request.body.clone()).send().await;
        metrics::record_upstream(provider, start);

        match result {
            Ok(inner) => {
                tracing::debug!(
                    provider = %provider,
                    status = %inner.status(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Upstream responded"
                );
                Ok(UpstreamResponse { inner })
            }
            Err(source) => Err(ForwardError::Transport(source)),
        }
    }
}

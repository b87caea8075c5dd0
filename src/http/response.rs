//! Response handling and transformation.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers from upstream responses
//! - Build the aggregated failure document when every provider failed
//! - Build the rejection returned when no provider is configured
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Failure documents embed the stats so a single response is enough to
//!   diagnose an outage

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::config::OperatingMode;
use crate::health::StatsSnapshot;

const HOP_BY_HOP: [header::HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove headers that only apply to the upstream connection.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

/// Body of the 500 returned when every available provider failed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDocument {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrock_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_error: Option<String>,
    pub stats: StatsSnapshot,
}

impl IntoResponse for FailureDocument {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

/// Body of the 503 returned when no provider is configured.
#[derive(Debug, Clone, Serialize)]
pub struct UnavailableDocument {
    pub error: String,
    pub mode: OperatingMode,
    pub stats: StatsSnapshot,
}

impl IntoResponse for UnavailableDocument {
    fn into_response(self) -> Response {
        (StatusCode::SERVICE_UNAVAILABLE, Json(self)).into_response()
    }
}

/// Plain 404 for unknown paths and methods.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

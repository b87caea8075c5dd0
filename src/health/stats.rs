//! Proxy outcome counters.
//!
//! # Responsibilities
//! - Count every accepted inference request exactly once
//! - Record exactly one terminal outcome per request
//! - Provide a consistent-enough snapshot for the diagnostics endpoint
//!
//! # Design Decisions
//! - Counters are atomics; `last_error` is a short-lived mutex never held
//!   across an await
//! - Terminal outcomes go through `RequestRecord`, a RAII guard, so a
//!   dropped handler still lands in `failures`

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::routing::Provider;

/// Counters owned by the failover router.
#[derive(Debug, Default)]
pub struct ProxyStats {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    bedrock_successes: AtomicU64,
    anthropic_failovers: AtomicU64,
    last_error: Mutex<Option<String>>,
}

/// Point-in-time copy of [`ProxyStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub bedrock_successes: u64,
    pub anthropic_failovers: u64,
    pub last_error: Option<String>,
}

impl ProxyStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a new inbound request and return the guard that records its outcome.
    pub fn begin(self: &Arc<Self>) -> RequestRecord {
        self.requests.fetch_add(1, Ordering::SeqCst);
        RequestRecord {
            stats: Arc::clone(self),
            finished: false,
        }
    }

    /// Remember the most recent provider error.
    pub fn set_last_error(&self, message: impl Into<String>) {
        let mut last = self.last_error.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(message.into());
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let last_error = self
            .last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        StatsSnapshot {
            requests: self.requests.load(Ordering::SeqCst),
            successes: self.successes.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            bedrock_successes: self.bedrock_successes.load(Ordering::SeqCst),
            anthropic_failovers: self.anthropic_failovers.load(Ordering::SeqCst),
            last_error,
        }
    }

    fn record_success(&self, provider: Provider) {
        match provider {
            Provider::Bedrock => self.bedrock_successes.fetch_add(1, Ordering::SeqCst),
            Provider::Anthropic => self.anthropic_failovers.fetch_add(1, Ordering::SeqCst),
        };
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }
}

/// Outcome slot for one in-flight request.
///
/// Exactly one of `succeed`/`fail` consumes it. Dropping it unfinished
/// (cancelled handler, listener timeout) records a failure.
#[derive(Debug)]
pub struct RequestRecord {
    stats: Arc<ProxyStats>,
    finished: bool,
}

impl RequestRecord {
    pub fn succeed(mut self, provider: Provider) {
        self.finished = true;
        self.stats.record_success(provider);
    }

    pub fn fail(mut self, message: impl Into<String>) {
        self.finished = true;
        self.stats.set_last_error(message);
        self.stats.record_failure();
    }
}

impl Drop for RequestRecord {
    fn drop(&mut self) {
        if !self.finished {
            self.stats.set_last_error("request cancelled before completion");
            self.stats.record_failure();
        }
    }
}

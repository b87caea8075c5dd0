//! Request accounting and diagnostics.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → ProxyStats::begin (requests += 1)
//!     → failover state machine
//!     → RequestRecord::succeed / fail (exactly one terminal outcome)
//!
//! GET <health path>
//!     → ProxyStats::snapshot (read only)
//! ```
//!
//! # Design Decisions
//! - Stats are owned by the server and passed by Arc, never global
//! - Counters reset on restart; nothing is persisted

pub mod stats;

pub use stats::{ProxyStats, RequestRecord, StatsSnapshot};

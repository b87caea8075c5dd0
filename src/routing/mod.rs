//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     UpstreamConfig
//!     → provider.rs (compute endpoints, fixed priority order)
//!     → Freeze as immutable RouteTable
//!
//! Incoming inference request:
//!     → credentials → OperatingMode
//!     → failover.rs (try each available route in order)
//!     → upstream response or aggregated failure
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: primary is always attempted first when available
//! - Failover is immediate; there is no retry of the same provider

pub mod failover;
pub mod provider;

pub use failover::Failover;
pub use provider::{Provider, Route, RouteTable};

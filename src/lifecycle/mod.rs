//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Credential preflight → Start listener
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT or internal trigger → Stop accepting → Release port → Exit
//! ```
//!
//! # Design Decisions
//! - Listener starts last (traffic only when ready)
//! - In-flight requests get no guaranteed grace period

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;

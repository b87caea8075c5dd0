//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (loopback)
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → [routing::Failover picks providers]
//!     → upstream.rs (provider request, streaming response)
//!     → response.rs (strip hop-by-hop headers, failure documents)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use request::X_REQUEST_ID;
pub use server::{HttpServer, ServerError};
pub use upstream::{ForwardError, UpstreamForwarder, UpstreamRequest, UpstreamResponse};

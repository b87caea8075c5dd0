//! Local inference failover proxy and client retry orchestrator.
//!
//! A loopback HTTP proxy tries the primary provider (Bedrock) first and
//! fails over to the secondary (Anthropic) on any transport error or
//! non-2xx response. Above it, a retry orchestrator re-runs the whole
//! client process when the client's own output reports rate limiting.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod orchestrator;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use orchestrator::RetryOrchestrator;

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, FAILOVER_* env overrides)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared by value/Arc with the server and orchestrator
//!
//! Per request / per attempt:
//!     credentials.rs reads provider secrets
//!     → resolve() → OperatingMode
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Secrets never enter ProxyConfig; they are read on demand

pub mod credentials;
pub mod loader;
pub mod schema;
pub mod validation;

pub use credentials::{resolve, CredentialSource, Credentials, EnvCredentials, OperatingMode, StaticCredentials};
pub use loader::{load_config, parse_config, default_config, ConfigError};
pub use schema::{
    AnthropicConfig, BedrockConfig, CredentialsConfig, GatewayConfig, ListenerConfig,
    ObservabilityConfig, OrchestratorConfig, ProxyConfig, TimeoutConfig, UpstreamConfig,
};

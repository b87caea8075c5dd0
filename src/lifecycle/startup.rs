//! Startup checks.
//!
//! # Design Decisions
//! - Fail fast: a strict configuration without credentials is fatal
//! - A lenient configuration starts anyway and rejects every request

use crate::config::{resolve, ConfigError, CredentialSource, OperatingMode, ProxyConfig};

/// Check that the proxy has something to forward to.
///
/// Returns the mode observed at startup. Requests still re-resolve it.
pub fn preflight(config: &ProxyConfig, credentials: &dyn CredentialSource) -> Result<OperatingMode, ConfigError> {
    let mode = resolve(&credentials.load());

    match mode {
        OperatingMode::Unavailable if config.credentials.strict => Err(ConfigError::MissingCredentials {
            bedrock_env: config.credentials.bedrock_token_env.clone(),
            anthropic_env: config.credentials.anthropic_key_env.clone(),
        }),
        OperatingMode::Unavailable => {
            tracing::warn!("No upstream credentials; inference requests will be rejected");
            Ok(mode)
        }
        OperatingMode::PrimaryOnly | OperatingMode::SecondaryOnly => {
            tracing::warn!(mode = %mode, "Only one provider configured; failover disabled");
            Ok(mode)
        }
        OperatingMode::Dual => {
            tracing::info!(mode = %mode, "Both providers configured");
            Ok(mode)
        }
    }
}

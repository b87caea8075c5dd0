//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, ProxyConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Invalid upstream endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("No upstream credentials configured (set {bedrock_env} and/or {anthropic_env})")]
    MissingCredentials {
        bedrock_env: String,
        anthropic_env: String,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Environment overrides are applied after parsing and before validation.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse configuration from a TOML string, applying environment overrides.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let mut config: ProxyConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Default configuration with environment overrides, validated.
pub fn default_config() -> Result<ProxyConfig, ConfigError> {
    parse_config("")
}

/// Overlay `FAILOVER_*` variables onto the parsed configuration.
///
/// Empty values are ignored. Gateway routing is only enabled when both
/// identifiers are supplied.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(addr) = var("FAILOVER_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(region) = var("FAILOVER_BEDROCK_REGION") {
        config.upstream.bedrock.region = region;
    }
    if let Some(model) = var("FAILOVER_BEDROCK_MODEL_ID") {
        config.upstream.bedrock.model_id = model;
    }
    if let Some(url) = var("FAILOVER_BEDROCK_BASE_URL") {
        config.upstream.bedrock.base_url = Some(url);
    }
    if let Some(url) = var("FAILOVER_ANTHROPIC_BASE_URL") {
        config.upstream.anthropic.base_url = Some(url);
    }
    if let Some(attempts) = var("FAILOVER_MAX_ATTEMPTS") {
        match attempts.parse() {
            Ok(n) => config.orchestrator.max_attempts = n,
            Err(_) => tracing::warn!(value = %attempts, "Ignoring non-numeric FAILOVER_MAX_ATTEMPTS"),
        }
    }

    match (var("FAILOVER_GATEWAY_ACCOUNT_ID"), var("FAILOVER_GATEWAY_ID")) {
        (Some(account_id), Some(gateway_id)) => {
            config.upstream.gateway = Some(GatewayConfig { account_id, gateway_id });
        }
        (Some(_), None) | (None, Some(_)) => {
            tracing::warn!("Gateway override needs both FAILOVER_GATEWAY_ACCOUNT_ID and FAILOVER_GATEWAY_ID; ignoring");
        }
        (None, None) => {}
    }
}

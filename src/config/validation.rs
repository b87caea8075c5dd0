//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, attempts >= 1)
//! - Enforce loopback-only listening
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check the configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.listener.bind_address.parse::<SocketAddr>() {
        Ok(addr) if !addr.ip().is_loopback() => errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{} is not a loopback address", addr),
        )),
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new("listener.bind_address", e.to_string())),
    }

    for (field, path) in [
        ("listener.inference_path", &config.listener.inference_path),
        ("listener.health_path", &config.listener.health_path),
    ] {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(field, "must start with '/'"));
        }
    }
    if config.listener.inference_path == config.listener.health_path {
        errors.push(ValidationError::new(
            "listener.health_path",
            "must differ from listener.inference_path",
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be > 0"));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be > 0"));
    }
    if config.timeouts.idle_secs == 0 {
        errors.push(ValidationError::new("timeouts.idle_secs", "must be > 0"));
    }

    if config.credentials.bedrock_token_env.is_empty() {
        errors.push(ValidationError::new("credentials.bedrock_token_env", "must not be empty"));
    }
    if config.credentials.anthropic_key_env.is_empty() {
        errors.push(ValidationError::new("credentials.anthropic_key_env", "must not be empty"));
    }

    let bedrock = &config.upstream.bedrock;
    if bedrock.model_id.trim().is_empty() {
        errors.push(ValidationError::new("upstream.bedrock.model_id", "must not be empty"));
    }
    if bedrock.region.trim().is_empty() {
        errors.push(ValidationError::new("upstream.bedrock.region", "must not be empty"));
    }
    check_base_url(&mut errors, "upstream.bedrock.base_url", bedrock.base_url.as_deref());
    check_base_url(
        &mut errors,
        "upstream.anthropic.base_url",
        config.upstream.anthropic.base_url.as_deref(),
    );

    if let Some(gateway) = &config.upstream.gateway {
        if gateway.account_id.trim().is_empty() {
            errors.push(ValidationError::new("upstream.gateway.account_id", "must not be empty"));
        }
        if gateway.gateway_id.trim().is_empty() {
            errors.push(ValidationError::new("upstream.gateway.gateway_id", "must not be empty"));
        }
    }

    let orchestrator = &config.orchestrator;
    if orchestrator.max_attempts == 0 {
        errors.push(ValidationError::new("orchestrator.max_attempts", "must be >= 1"));
    }
    if orchestrator.preference_env.is_empty() {
        errors.push(ValidationError::new("orchestrator.preference_env", "must not be empty"));
    }
    if orchestrator.rate_limit_patterns.iter().all(|p| p.is_empty()) {
        errors.push(ValidationError::new(
            "orchestrator.rate_limit_patterns",
            "needs at least one non-empty pattern",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_base_url(errors: &mut Vec<ValidationError>, field: &'static str, value: Option<&str>) {
    let Some(value) = value else { return };
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::GatewayConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "0.0.0.0:8080".into();
        config.timeouts.idle_secs = 0;
        config.orchestrator.max_attempts = 0;
        config.upstream.bedrock.base_url = Some("ftp://example.com".into());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "timeouts.idle_secs",
                "upstream.bedrock.base_url",
                "orchestrator.max_attempts",
            ]
        );
    }

    #[test]
    fn test_paths_must_differ() {
        let mut config = ProxyConfig::default();
        config.listener.health_path = config.listener.inference_path.clone();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "listener.health_path");
    }

    #[test]
    fn test_empty_gateway_ids_rejected() {
        let mut config = ProxyConfig::default();
        config.upstream.gateway = Some(GatewayConfig {
            account_id: " ".into(),
            gateway_id: "gw".into(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "upstream.gateway.account_id");
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy
//! and the retry orchestrator. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, endpoint paths).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Where credentials come from and how strictly their absence is treated.
    pub credentials: CredentialsConfig,

    /// Upstream provider endpoints.
    pub upstream: UpstreamConfig,

    /// Client retry loop settings.
    pub orchestrator: OrchestratorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address. Must be a loopback address.
    pub bind_address: String,

    /// Path of the inference endpoint.
    pub inference_path: String,

    /// Path of the diagnostics endpoint.
    pub health_path: String,

    /// Largest inbound request body accepted, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            inference_path: "/v1/messages".to_string(),
            health_path: "/health".to_string(),
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Per-request idle timeout on the listener in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            idle_secs: 600,
        }
    }
}

/// Credential configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Environment variable holding the Bedrock bearer token.
    pub bedrock_token_env: String,

    /// Environment variable holding the Anthropic API key.
    pub anthropic_key_env: String,

    /// Refuse to start when no provider is usable.
    pub strict: bool,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            bedrock_token_env: "AWS_BEARER_TOKEN_BEDROCK".to_string(),
            anthropic_key_env: "ANTHROPIC_API_KEY".to_string(),
            strict: true,
        }
    }
}

/// Upstream provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    pub bedrock: BedrockConfig,
    pub anthropic: AnthropicConfig,

    /// Route both providers through an AI gateway.
    pub gateway: Option<GatewayConfig>,
}

/// Primary provider settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BedrockConfig {
    /// AWS region of the Bedrock runtime.
    pub region: String,

    /// Model identifier encoded into the invoke path.
    pub model_id: String,

    /// Overrides the computed base URL (e.g. "http://127.0.0.1:9000").
    pub base_url: Option<String>,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            model_id: "us.anthropic.claude-sonnet-4-20250514-v1:0".to_string(),
            base_url: None,
        }
    }
}

/// Secondary provider settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AnthropicConfig {
    /// Overrides the computed base URL.
    pub base_url: Option<String>,
}

/// AI gateway routing identifiers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    pub account_id: String,
    pub gateway_id: String,
}

/// Retry orchestrator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum number of outer attempts.
    pub max_attempts: u32,

    /// Environment variable exported to the client carrying the preference.
    pub preference_env: String,

    /// Case-sensitive substrings that mark a line as a rate-limit signal.
    pub rate_limit_patterns: Vec<String>,

    /// How much of the tail of the client's output is retained per attempt.
    pub output_tail_bytes: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            preference_env: "FAILOVER_PROVIDER_PREFERENCE".to_string(),
            rate_limit_patterns: default_rate_limit_patterns(),
            output_tail_bytes: 64 * 1024,
        }
    }
}

fn default_rate_limit_patterns() -> Vec<String> {
    [
        "429",
        "Too Many Requests",
        "too many requests",
        "rate limit",
        "Rate limit",
        "rate_limit",
        "throttl",
        "Throttl",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}

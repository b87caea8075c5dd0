//! Provider identity and the ordered route table.
//!
//! # Design Decisions
//! - Providers are a closed set; priority is their position in the table
//! - Endpoints are computed once at startup and never change
//! - Adding a provider means adding a variant and a table entry, the
//!   failover loop itself does not change

use serde::Serialize;
use std::fmt;
use url::Url;

use crate::config::{ConfigError, OperatingMode, UpstreamConfig};

const GATEWAY_BASE: &str = "https://gateway.ai.cloudflare.com/v1";
const ANTHROPIC_BASE: &str = "https://api.anthropic.com";

/// An upstream inference provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Primary: AWS Bedrock runtime, bearer-token auth.
    Bedrock,
    /// Secondary: Anthropic Messages API, API-key auth.
    Anthropic,
}

impl Provider {
    /// All providers in failover priority order.
    pub const PRIORITY: [Provider; 2] = [Provider::Bedrock, Provider::Anthropic];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Bedrock => "bedrock",
            Provider::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider together with the endpoint requests are sent to.
#[derive(Debug, Clone)]
pub struct Route {
    pub provider: Provider,
    pub endpoint: Url,
}

/// Routes in fixed priority order.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compute the endpoint of every provider from configuration.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ConfigError> {
        let routes = Provider::PRIORITY
            .iter()
            .map(|&provider| {
                let endpoint = match provider {
                    Provider::Bedrock => bedrock_endpoint(config)?,
                    Provider::Anthropic => anthropic_endpoint(config)?,
                };
                Ok(Route { provider, endpoint })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { routes })
    }

    /// Routes usable in `mode`, highest priority first.
    pub fn available(&self, mode: OperatingMode) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(move |r| mode.allows(r.provider))
    }

    pub fn get(&self, provider: Provider) -> Option<&Route> {
        self.routes.iter().find(|r| r.provider == provider)
    }
}

fn bedrock_endpoint(config: &UpstreamConfig) -> Result<Url, ConfigError> {
    let bedrock = &config.bedrock;
    let base = match (&bedrock.base_url, &config.gateway) {
        (Some(url), _) => url.clone(),
        (None, Some(gw)) => format!(
            "{}/{}/{}/aws-bedrock/bedrock-runtime/{}",
            GATEWAY_BASE, gw.account_id, gw.gateway_id, bedrock.region
        ),
        (None, None) => format!("https://bedrock-runtime.{}.amazonaws.com", bedrock.region),
    };
    join_segments(&base, &["model", &bedrock.model_id, "invoke"])
}

fn anthropic_endpoint(config: &UpstreamConfig) -> Result<Url, ConfigError> {
    let base = match (&config.anthropic.base_url, &config.gateway) {
        (Some(url), _) => url.clone(),
        (None, Some(gw)) => format!("{}/{}/{}/anthropic", GATEWAY_BASE, gw.account_id, gw.gateway_id),
        (None, None) => ANTHROPIC_BASE.to_string(),
    };
    join_segments(&base, &["v1", "messages"])
}

/// Append percent-encoded path segments to `base`.
fn join_segments(base: &str, segments: &[&str]) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        url: base.to_string(),
        reason,
    };

    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("URL cannot be a base".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;

    #[test]
    fn test_default_endpoints() {
        let table = RouteTable::from_config(&UpstreamConfig::default()).unwrap();

        let bedrock = table.get(Provider::Bedrock).unwrap();
        assert_eq!(
            bedrock.endpoint.as_str(),
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/us.anthropic.claude-sonnet-4-20250514-v1:0/invoke"
        );

        let anthropic = table.get(Provider::Anthropic).unwrap();
        assert_eq!(anthropic.endpoint.as_str(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_gateway_endpoints() {
        let mut config = UpstreamConfig::default();
        config.gateway = Some(GatewayConfig {
            account_id: "acct".into(),
            gateway_id: "gw".into(),
        });
        let table = RouteTable::from_config(&config).unwrap();

        assert!(table
            .get(Provider::Bedrock)
            .unwrap()
            .endpoint
            .as_str()
            .starts_with("https://gateway.ai.cloudflare.com/v1/acct/gw/aws-bedrock/bedrock-runtime/us-east-1/model/"));
        assert_eq!(
            table.get(Provider::Anthropic).unwrap().endpoint.as_str(),
            "https://gateway.ai.cloudflare.com/v1/acct/gw/anthropic/v1/messages"
        );
    }

    #[test]
    fn test_model_id_is_encoded_as_one_segment() {
        let mut config = UpstreamConfig::default();
        config.bedrock.base_url = Some("http://127.0.0.1:9000/".into());
        config.bedrock.model_id = "arn:aws:bedrock:us-east-1:1:inference-profile/x".into();
        let table = RouteTable::from_config(&config).unwrap();

        assert_eq!(
            table.get(Provider::Bedrock).unwrap().endpoint.path(),
            "/model/arn:aws:bedrock:us-east-1:1:inference-profile%2Fx/invoke"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = UpstreamConfig::default();
        config.anthropic.base_url = Some("not a url".into());
        assert!(matches!(
            RouteTable::from_config(&config),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_available_respects_priority_and_mode() {
        let table = RouteTable::from_config(&UpstreamConfig::default()).unwrap();

        let dual: Vec<_> = table.available(OperatingMode::Dual).map(|r| r.provider).collect();
        assert_eq!(dual, vec![Provider::Bedrock, Provider::Anthropic]);

        let secondary: Vec<_> = table
            .available(OperatingMode::SecondaryOnly)
            .map(|r| r.provider)
            .collect();
        assert_eq!(secondary, vec![Provider::Anthropic]);

        assert_eq!(table.available(OperatingMode::Unavailable).count(), 0);
    }
}

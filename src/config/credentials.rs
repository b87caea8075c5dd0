//! Credential resolution.
//!
//! Credentials live in the process environment for the lifetime of the
//! process but are read fresh at every decision point, never cached, so a
//! request always sees the credentials in effect when it arrived.

use serde::Serialize;
use std::fmt;

use crate::config::schema::CredentialsConfig;
use crate::routing::Provider;

/// Secrets for the upstream providers.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Bearer token for Bedrock.
    pub bedrock_token: Option<String>,
    /// API key for Anthropic.
    pub anthropic_key: Option<String>,
}

impl Credentials {
    /// The secret used to authenticate against `provider`, if configured.
    pub fn secret_for(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Bedrock => self.bedrock_token.as_deref(),
            Provider::Anthropic => self.anthropic_key.as_deref(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bedrock_token", &self.bedrock_token.as_ref().map(|_| "<redacted>"))
            .field("anthropic_key", &self.anthropic_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Which providers are usable with the current credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperatingMode {
    Dual,
    PrimaryOnly,
    SecondaryOnly,
    /// Nothing to proxy to.
    Unavailable,
}

impl OperatingMode {
    /// Whether `provider` may be attempted in this mode.
    pub fn allows(self, provider: Provider) -> bool {
        match (self, provider) {
            (OperatingMode::Dual, _) => true,
            (OperatingMode::PrimaryOnly, Provider::Bedrock) => true,
            (OperatingMode::SecondaryOnly, Provider::Anthropic) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperatingMode::Dual => "dual",
            OperatingMode::PrimaryOnly => "primary-only",
            OperatingMode::SecondaryOnly => "secondary-only",
            OperatingMode::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the operating mode from credential presence.
pub fn resolve(credentials: &Credentials) -> OperatingMode {
    match (
        credentials.bedrock_token.is_some(),
        credentials.anthropic_key.is_some(),
    ) {
        (true, true) => OperatingMode::Dual,
        (true, false) => OperatingMode::PrimaryOnly,
        (false, true) => OperatingMode::SecondaryOnly,
        (false, false) => OperatingMode::Unavailable,
    }
}

/// Source of credentials, consulted on every request.
pub trait CredentialSource: Send + Sync {
    fn load(&self) -> Credentials;
}

/// Reads credentials from environment variables at call time.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    bedrock_env: String,
    anthropic_env: String,
}

impl EnvCredentials {
    pub fn new(config: &CredentialsConfig) -> Self {
        Self {
            bedrock_env: config.bedrock_token_env.clone(),
            anthropic_env: config.anthropic_key_env.clone(),
        }
    }

    fn read(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

impl CredentialSource for EnvCredentials {
    fn load(&self) -> Credentials {
        Credentials {
            bedrock_token: Self::read(&self.bedrock_env),
            anthropic_key: Self::read(&self.anthropic_env),
        }
    }
}

/// Fixed credentials.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub Credentials);

impl StaticCredentials {
    pub fn new(bedrock_token: Option<&str>, anthropic_key: Option<&str>) -> Self {
        Self(Credentials {
            bedrock_token: bedrock_token.map(str::to_string),
            anthropic_key: anthropic_key.map(str::to_string),
        })
    }
}

impl CredentialSource for StaticCredentials {
    fn load(&self) -> Credentials {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_modes() {
        let cases = [
            (Some("t"), Some("k"), OperatingMode::Dual),
            (Some("t"), None, OperatingMode::PrimaryOnly),
            (None, Some("k"), OperatingMode::SecondaryOnly),
            (None, None, OperatingMode::Unavailable),
        ];
        for (token, key, expected) in cases {
            let creds = StaticCredentials::new(token, key).load();
            assert_eq!(resolve(&creds), expected);
        }
    }

    #[test]
    fn test_mode_allows() {
        assert!(OperatingMode::Dual.allows(Provider::Bedrock));
        assert!(OperatingMode::Dual.allows(Provider::Anthropic));
        assert!(!OperatingMode::PrimaryOnly.allows(Provider::Anthropic));
        assert!(!OperatingMode::SecondaryOnly.allows(Provider::Bedrock));
        assert!(!OperatingMode::Unavailable.allows(Provider::Bedrock));
    }

    #[test]
    fn test_env_source_treats_blank_as_absent() {
        let config = CredentialsConfig {
            bedrock_token_env: "PF_TEST_CREDENTIALS_TOKEN".into(),
            anthropic_key_env: "PF_TEST_CREDENTIALS_KEY".into(),
            strict: true,
        };
        std::env::set_var("PF_TEST_CREDENTIALS_TOKEN", "  ");
        std::env::set_var("PF_TEST_CREDENTIALS_KEY", "sk-test");

        let creds = EnvCredentials::new(&config).load();
        assert!(creds.bedrock_token.is_none());
        assert_eq!(creds.anthropic_key.as_deref(), Some("sk-test"));
        assert_eq!(resolve(&creds), OperatingMode::SecondaryOnly);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = StaticCredentials::new(Some("secret-token"), None).load();
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_mode_serializes_kebab_case() {
        let json = serde_json::to_string(&OperatingMode::PrimaryOnly).unwrap();
        assert_eq!(json, "\"primary-only\"");
    }
}

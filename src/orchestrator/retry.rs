//! Bounded retry loop around whole client runs.
//!
//! ```text
//! for attempt in 1..=max_attempts:
//!     launch(preferred)          preferred = primary if configured
//!     exit 0                     → success, stop
//!     exit != 0, no rate limit   → fatal, stop
//!     rate limited on primary and secondary configured:
//!         launch(secondary)      same attempt, no delay
//!         exit 0 → success; not rate limited → fatal
//!     still rate limited         → next attempt, back to preferred
//! attempts exhausted             → error with the last exit code
//! ```

use serde::Serialize;

use crate::config::Credentials;
use crate::orchestrator::launcher::{ClientLauncher, ClientOutcome};
use crate::orchestrator::{OrchestratorError, ProviderPreference};

/// Record of one client launch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryAttempt {
    pub attempt: u32,
    pub preference: ProviderPreference,
    pub rate_limited: bool,
    pub exit_code: Option<i32>,
    #[serde(skip)]
    pub output: String,
}

/// Launches made by a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationReport {
    pub launches: Vec<RetryAttempt>,
}

impl OrchestrationReport {
    /// Number of client processes started.
    pub fn spawns(&self) -> usize {
        self.launches.len()
    }

    /// The launch that succeeded.
    pub fn last(&self) -> Option<&RetryAttempt> {
        self.launches.last()
    }
}

enum Verdict {
    Succeeded,
    Fatal,
    RateLimited,
}

/// Re-runs the client while it keeps reporting rate limits.
pub struct RetryOrchestrator<L> {
    launcher: L,
    max_attempts: u32,
    primary_configured: bool,
    secondary_configured: bool,
}

impl<L: ClientLauncher> RetryOrchestrator<L> {
    /// Create an orchestrator for the credentials present at startup.
    pub fn new(launcher: L, max_attempts: u32, credentials: &Credentials) -> Result<Self, OrchestratorError> {
        let primary_configured = credentials.bedrock_token.is_some();
        let secondary_configured = credentials.anthropic_key.is_some();
        if !primary_configured && !secondary_configured {
            return Err(OrchestratorError::MissingCredentials);
        }

        Ok(Self {
            launcher,
            max_attempts: max_attempts.max(1),
            primary_configured,
            secondary_configured,
        })
    }

    /// Run the client until it succeeds, fails fatally, or attempts run out.
    pub async fn run(&self) -> Result<OrchestrationReport, OrchestratorError> {
        let preferred = if self.primary_configured {
            ProviderPreference::Primary
        } else {
            ProviderPreference::Secondary
        };
        let mut launches = Vec::new();
        let mut last_exit = None;

        for attempt in 1..=self.max_attempts {
            tracing::info!(attempt, max_attempts = self.max_attempts, preference = %preferred, "Starting client attempt");

            let outcome = self.launch(attempt, preferred, &mut launches).await?;
            last_exit = outcome.exit_code;
            match classify(&outcome) {
                Verdict::Succeeded => return Ok(OrchestrationReport { launches }),
                Verdict::Fatal => return Err(fatal(attempt, &outcome)),
                Verdict::RateLimited => {}
            }

            if preferred == ProviderPreference::Primary && self.secondary_configured {
                tracing::warn!(attempt, "Rate limited on primary, switching to secondary immediately");

                let outcome = self.launch(attempt, ProviderPreference::Secondary, &mut launches).await?;
                last_exit = outcome.exit_code;
                match classify(&outcome) {
                    Verdict::Succeeded => return Ok(OrchestrationReport { launches }),
                    Verdict::Fatal => return Err(fatal(attempt, &outcome)),
                    Verdict::RateLimited => {}
                }
            }

            tracing::warn!(attempt, max_attempts = self.max_attempts, "Client rate limited");
        }

        tracing::error!(attempts = self.max_attempts, "Rate limiting persisted across all attempts");
        Err(OrchestratorError::RateLimitExhausted {
            attempts: self.max_attempts,
            exit_code: last_exit,
        })
    }

    async fn launch(
        &self,
        attempt: u32,
        preference: ProviderPreference,
        launches: &mut Vec<RetryAttempt>,
    ) -> Result<ClientOutcome, OrchestratorError> {
        let outcome = self.launcher.launch(preference).await?;
        launches.push(RetryAttempt {
            attempt,
            preference,
            rate_limited: outcome.rate_limited,
            exit_code: outcome.exit_code,
            output: outcome.output.clone(),
        });
        Ok(outcome)
    }
}

fn classify(outcome: &ClientOutcome) -> Verdict {
    if outcome.succeeded() {
        Verdict::Succeeded
    } else if outcome.rate_limited {
        Verdict::RateLimited
    } else {
        Verdict::Fatal
    }
}

fn fatal(attempt: u32, outcome: &ClientOutcome) -> OrchestratorError {
    tracing::error!(attempt, exit_code = ?outcome.exit_code, "Client failed without rate limiting; not retrying");
    OrchestratorError::ClientFailed {
        attempt,
        exit_code: outcome.exit_code,
    }
}

//! Client retry orchestration.
//!
//! # Data Flow
//! ```text
//! RetryOrchestrator::run
//!     → launcher.rs (spawn client with an explicit ProviderPreference)
//!         → stdout/stderr read line by line
//!         → detector.rs (rate-limit heuristic per line)
//!     → retry.rs (classify outcome: success / fatal / rate limited)
//!     → on rate limit: same attempt on secondary, then next attempt
//! ```
//!
//! # Design Decisions
//! - The preference is an argument to every launch, never process-wide state
//! - Only failures positively classified as rate limiting are retried
//! - No delay between launches

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub mod detector;
pub mod launcher;
pub mod retry;

pub use detector::{PatternDetector, RateLimitDetector};
pub use launcher::{ClientCommand, ClientLauncher, ClientOutcome, ProcessLauncher};
pub use retry::{OrchestrationReport, RetryAttempt, RetryOrchestrator};

/// Which provider the client should be pointed at for one launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderPreference {
    Primary,
    Secondary,
}

impl ProviderPreference {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderPreference::Primary => "primary",
            ProviderPreference::Secondary => "secondary",
        }
    }
}

impl fmt::Display for ProviderPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an orchestrated run did not succeed.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Neither provider credential is present.
    #[error("no provider credentials configured; nothing to run against")]
    MissingCredentials,

    /// The prompt file could not be opened.
    #[error("cannot open prompt file {}: {source}", .path.display())]
    Prompt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The client could not be started or waited on.
    #[error("failed to run client '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The client failed for a reason other than rate limiting.
    #[error("client exited with {} (not rate limited) on attempt {attempt}", describe_exit(.exit_code))]
    ClientFailed { attempt: u32, exit_code: Option<i32> },

    /// Every attempt ended rate limited.
    #[error("client still rate limited after {attempts} attempts (last exit {})", describe_exit(.exit_code))]
    RateLimitExhausted { attempts: u32, exit_code: Option<i32> },
}

impl OrchestratorError {
    /// Process exit code to report for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            OrchestratorError::ClientFailed { exit_code, .. }
            | OrchestratorError::RateLimitExhausted { exit_code, .. } => match exit_code {
                Some(code) if *code != 0 => *code,
                _ => 1,
            },
            _ => 1,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        let failed = OrchestratorError::ClientFailed { attempt: 1, exit_code: Some(3) };
        assert_eq!(failed.exit_code(), 3);

        let killed = OrchestratorError::RateLimitExhausted { attempts: 5, exit_code: None };
        assert_eq!(killed.exit_code(), 1);
        assert!(killed.to_string().contains("after 5 attempts"));

        assert_eq!(OrchestratorError::MissingCredentials.exit_code(), 1);
    }
}

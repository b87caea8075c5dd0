//! Rate-limit detection in free-form client output.
//!
//! Detection is a case-sensitive substring match per output line. It is a
//! heuristic: a client that rewords its errors will slip through. It sits
//! behind [`RateLimitDetector`] so a structured signal can replace it
//! without touching the retry loop.

use crate::config::OrchestratorConfig;

/// Decides whether one line of client output signals rate limiting.
pub trait RateLimitDetector: Send + Sync {
    fn is_rate_limited(&self, line: &str) -> bool;
}

/// Matches any of a fixed list of substrings.
#[derive(Debug, Clone)]
pub struct PatternDetector {
    patterns: Vec<String>,
}

impl PatternDetector {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(config.rate_limit_patterns.iter().cloned())
    }
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::default())
    }
}

impl RateLimitDetector for PatternDetector {
    fn is_rate_limited(&self, line: &str) -> bool {
        self.patterns.iter().any(|p| line.contains(p.as_str()))
    }
}

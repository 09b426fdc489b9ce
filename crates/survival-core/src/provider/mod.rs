//! Decision Providers
//!
//! The engine never talks to a model directly. It hands a rendered prompt to a
//! [`DecisionProvider`] and parses whatever text comes back. Network-backed
//! providers live outside this crate; the offline ones here drive tests and
//! the CLI.

pub mod scripted;
pub mod seeded;

use std::future::Future;
use std::time::Duration;

use survival_events::DecisionRules;

use crate::error::ProviderError;

pub use scripted::{decision_json, ScriptedProvider};
pub use seeded::SeededProvider;

/// One decision request: who is deciding, when, and the rendered prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRequest {
    pub agent_id: String,
    pub turn: u32,
    pub prompt: String,
}

/// Source of raw decision replies.
///
/// Implementations are shared across the concurrent decision tasks of a
/// turn, so they must be `Send + Sync` and must not rely on call order for
/// anything that ends up in the run log.
pub trait DecisionProvider: Send + Sync {
    fn request(
        &self,
        request: &DecisionRequest,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/// Retry delays: `base * 2^attempt`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub max: Duration,
}

impl ExponentialBackoff {
    pub fn from_rules(rules: &DecisionRules) -> Self {
        Self {
            base: Duration::from_millis(rules.base_backoff_ms),
            max: Duration::from_millis(rules.max_backoff_ms),
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        let backoff = ExponentialBackoff {
            base: Duration::from_millis(500),
            max: Duration::from_millis(3000),
        };
        assert_eq!(backoff.delay(0), Duration::from_millis(500));
        assert_eq!(backoff.delay(1), Duration::from_millis(1000));
        assert_eq!(backoff.delay(2), Duration::from_millis(2000));
        assert_eq!(backoff.delay(3), Duration::from_millis(3000));
        assert_eq!(backoff.delay(40), Duration::from_millis(3000));
    }

    #[test]
    fn test_backoff_from_rules() {
        let backoff = ExponentialBackoff::from_rules(&DecisionRules::default());
        assert_eq!(backoff.base, Duration::from_millis(500));
        assert_eq!(backoff.max, Duration::from_millis(8000));
    }
}

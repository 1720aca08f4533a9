//! Retry policy: decides whether a classified failure is worth another attempt

use std::time::Duration;

use crate::domain::job::FailureKind;

/// Decision for one failed attempt, computed fresh each time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryDecision {
    pub should_retry: bool,
    /// Backoff before the next attempt; zero when not retrying
    pub delay: Duration,
    /// Attempts left in the step's budget after the one that just failed
    pub attempts_remaining: u32,
}

/// Exponential-backoff retry policy.
///
/// Delay grows as `base_delay * multiplier^(attempt - 1)`, so delays for
/// the same step are strictly increasing across attempts. How many
/// attempts a classification is worth:
///
///   timeout / network / server-error / rate-limited -> the step's budget
///   auth / unknown                                  -> one retry, total 2
///   invalid-input / insufficient-balance            -> never
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    base_delay: Duration,
    multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with a custom backoff curve.
    /// The multiplier is clamped to be > 1 so delays always increase.
    pub fn new(base_delay: Duration, multiplier: f64) -> Self {
        Self {
            base_delay: base_delay.max(Duration::from_millis(1)),
            multiplier: multiplier.max(1.1),
        }
    }

    /// Backoff for the attempt that just failed (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        self.base_delay.mul_f64(self.multiplier.powi(exponent))
    }

    /// Decide whether `attempt` (1-based, just failed) should be retried
    /// given the step's total attempt `budget`.
    pub fn decide(&self, kind: FailureKind, attempt: u32, budget: u32) -> RetryDecision {
        let allowed = match kind {
            FailureKind::Timeout
            | FailureKind::Network
            | FailureKind::ServerError
            | FailureKind::RateLimited => budget,
            FailureKind::Auth | FailureKind::Unknown => budget.min(2),
            FailureKind::InvalidInput | FailureKind::InsufficientBalance => 1,
        };

        let should_retry = attempt < allowed;
        RetryDecision {
            should_retry,
            delay: if should_retry {
                self.delay_for(attempt)
            } else {
                Duration::ZERO
            },
            attempts_remaining: allowed.saturating_sub(attempt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_never_retries() {
        let policy = RetryPolicy::default();
        let decision = policy.decide(FailureKind::InvalidInput, 1, 3);
        assert!(!decision.should_retry);
        assert_eq!(decision.attempts_remaining, 0);
        assert_eq!(decision.delay, Duration::ZERO);
    }

    #[test]
    fn insufficient_balance_never_retries() {
        let policy = RetryPolicy::default();
        assert!(!policy.decide(FailureKind::InsufficientBalance, 1, 3).should_retry);
    }

    #[test]
    fn timeout_retries_to_budget_then_stops() {
        let policy = RetryPolicy::default();
        assert!(policy.decide(FailureKind::Timeout, 1, 3).should_retry);
        assert!(policy.decide(FailureKind::Timeout, 2, 3).should_retry);
        assert!(!policy.decide(FailureKind::Timeout, 3, 3).should_retry);
    }

    #[test]
    fn auth_retries_exactly_once_even_with_large_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.decide(FailureKind::Auth, 1, 5).should_retry);
        assert!(!policy.decide(FailureKind::Auth, 2, 5).should_retry);
    }

    #[test]
    fn unknown_retries_conservatively_once() {
        let policy = RetryPolicy::default();
        assert!(policy.decide(FailureKind::Unknown, 1, 5).should_retry);
        assert!(!policy.decide(FailureKind::Unknown, 2, 5).should_retry);
    }

    #[test]
    fn auth_respects_budget_of_one() {
        let policy = RetryPolicy::default();
        assert!(!policy.decide(FailureKind::Auth, 1, 1).should_retry);
    }

    #[test]
    fn delays_strictly_increase() {
        let policy = RetryPolicy::default();
        let mut last = Duration::ZERO;
        for attempt in 1..=5 {
            let delay = policy.delay_for(attempt);
            assert!(delay > last, "attempt {} delay {:?} <= {:?}", attempt, delay, last);
            last = delay;
        }
    }

    #[test]
    fn default_backoff_curve() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
    }

    #[test]
    fn degenerate_multiplier_is_clamped() {
        let policy = RetryPolicy::new(Duration::from_millis(100), 0.5);
        assert!(policy.delay_for(2) > policy.delay_for(1));
    }

    #[test]
    fn attempts_remaining_never_exceeds_budget() {
        let policy = RetryPolicy::default();
        for attempt in 1..=4 {
            let decision = policy.decide(FailureKind::Network, attempt, 3);
            assert!(decision.attempts_remaining <= 3 - attempt.min(3));
        }
    }
}

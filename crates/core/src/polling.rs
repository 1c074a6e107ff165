//! Polling cadence, attempt budgets and the per-tick stop decision.

use std::time::Duration;

use crate::content::ContentKind;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default delay between two polling ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Upper bound on the tick delay when backoff is enabled.
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// A quiet tick is logged every this many attempts.
pub const DEFAULT_LOG_EVERY: u32 = 5;
/// Hard ceiling on a caller-supplied attempt budget.
pub const MAX_ATTEMPTS_LIMIT: u32 = 1000;

/// Default attempt budget for a content kind.
///
/// Training sets are large batches and get twice the single-image budget;
/// daily posts are short text-plus-image renders.
pub fn default_max_attempts(kind: ContentKind) -> u32 {
    match kind {
        ContentKind::ProfileImage => 60,
        ContentKind::TrainingImage => 120,
        ContentKind::StyledImage => 60,
        ContentKind::DailyPost => 36,
    }
}

// ---------------------------------------------------------------------------
// PollingPolicy
// ---------------------------------------------------------------------------

/// Tunable parameters for the polling scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct PollingPolicy {
    /// Delay before the first tick and between ticks.
    pub interval: Duration,
    /// Factor applied to the delay after every tick (1.0 = fixed).
    pub backoff_multiplier: f64,
    /// Upper bound on the delay between ticks.
    pub max_interval: Duration,
    /// Quiet ticks are summarised in the job log every `log_every` attempts.
    pub log_every: u32,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            backoff_multiplier: 1.0,
            max_interval: DEFAULT_MAX_POLL_INTERVAL,
            log_every: DEFAULT_LOG_EVERY,
        }
    }
}

impl PollingPolicy {
    /// Load overrides from environment variables.
    ///
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `POLL_INTERVAL_MS`        | `5000`  |
    /// | `POLL_MAX_INTERVAL_MS`    | `30000` |
    /// | `POLL_BACKOFF_MULTIPLIER` | `1.0`   |
    /// | `POLL_LOG_EVERY`          | `5`     |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let interval = std::env::var("POLL_INTERVAL_MS")
            .ok()
            .map(|v| v.parse::<u64>().expect("POLL_INTERVAL_MS must be a valid u64"))
            .map(Duration::from_millis)
            .unwrap_or(defaults.interval);

        let max_interval = std::env::var("POLL_MAX_INTERVAL_MS")
            .ok()
            .map(|v| {
                v.parse::<u64>()
                    .expect("POLL_MAX_INTERVAL_MS must be a valid u64")
            })
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_interval);

        let backoff_multiplier = std::env::var("POLL_BACKOFF_MULTIPLIER")
            .ok()
            .map(|v| {
                v.parse::<f64>()
                    .expect("POLL_BACKOFF_MULTIPLIER must be a number")
            })
            .unwrap_or(defaults.backoff_multiplier);

        let log_every = std::env::var("POLL_LOG_EVERY")
            .ok()
            .map(|v| v.parse::<u32>().expect("POLL_LOG_EVERY must be a valid u32"))
            .unwrap_or(defaults.log_every);

        Self {
            interval,
            backoff_multiplier: backoff_multiplier.max(1.0),
            max_interval: max_interval.max(interval),
            log_every: log_every.max(1),
        }
    }

    /// Whether a quiet tick at `attempt` should still be summarised.
    pub fn is_log_tick(&self, attempt: u32) -> bool {
        self.log_every > 0 && attempt % self.log_every == 0
    }
}

/// Calculate the delay before the next tick.
///
/// The result is clamped to [`PollingPolicy::max_interval`]; with the
/// default multiplier of 1.0 the interval stays fixed.
pub fn next_delay(current: Duration, policy: &PollingPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.backoff_multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_interval.max(policy.interval))
}

// ---------------------------------------------------------------------------
// Stop decision
// ---------------------------------------------------------------------------

/// Outcome of evaluating a job after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// Enough matches were found.
    Complete,
    /// Attempt budget exhausted without enough matches.
    Exhausted,
    /// Schedule another tick.
    Continue,
}

/// Decide what happens after a tick. Satisfaction wins over exhaustion
/// when both hold on the same tick.
pub fn evaluate_tick(
    matched: usize,
    target_count: u32,
    attempts: u32,
    max_attempts: u32,
) -> TickDecision {
    if matched >= target_count as usize {
        TickDecision::Complete
    } else if attempts >= max_attempts {
        TickDecision::Exhausted
    } else {
        TickDecision::Continue
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- Backoff --

    #[test]
    fn default_policy_keeps_interval_fixed() {
        let policy = PollingPolicy::default();
        let d = next_delay(policy.interval, &policy);
        assert_eq!(d, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn backoff_grows_and_clamps() {
        let policy = PollingPolicy {
            interval: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            max_interval: Duration::from_secs(10),
            ..Default::default()
        };
        let mut delay = policy.interval;
        let expected = [2, 4, 8, 10, 10];
        for &secs in &expected {
            assert_eq!(delay.as_secs(), secs);
            delay = next_delay(delay, &policy);
        }
    }

    #[test]
    fn max_interval_below_interval_does_not_shrink_delay() {
        let policy = PollingPolicy {
            interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(1),
            ..Default::default()
        };
        assert_eq!(next_delay(policy.interval, &policy), Duration::from_secs(5));
    }

    // -- Log cadence --

    #[test]
    fn log_tick_every_kth_attempt() {
        let policy = PollingPolicy {
            log_every: 3,
            ..Default::default()
        };
        let logged: Vec<u32> = (1..=9).filter(|a| policy.is_log_tick(*a)).collect();
        assert_eq!(logged, [3, 6, 9]);
    }

    // -- Attempt budgets --

    #[test]
    fn training_sets_get_the_largest_budget() {
        let max = ContentKind::ALL
            .into_iter()
            .max_by_key(|k| default_max_attempts(*k))
            .unwrap();
        assert_eq!(max, ContentKind::TrainingImage);
    }

    // -- Stop decision --

    #[test]
    fn complete_when_target_reached() {
        assert_eq!(evaluate_tick(1, 1, 3, 10), TickDecision::Complete);
    }

    #[test]
    fn complete_wins_on_last_attempt() {
        assert_eq!(evaluate_tick(20, 20, 60, 60), TickDecision::Complete);
    }

    #[test]
    fn exhausted_at_budget() {
        assert_eq!(evaluate_tick(19, 20, 60, 60), TickDecision::Exhausted);
    }

    #[test]
    fn continue_otherwise() {
        assert_eq!(evaluate_tick(0, 1, 2, 10), TickDecision::Continue);
    }
}

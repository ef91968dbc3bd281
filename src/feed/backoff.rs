use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// No policy waits less than this between attempts
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(100);

/// How long to wait before the next push-channel attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Constant interval between attempts
    Fixed {
        #[serde(default = "default_fixed_delay")]
        delay_ms: u64,
    },

    /// Exponential backoff with a cap and optional equal jitter
    Exponential {
        #[serde(default = "default_initial_delay")]
        initial_delay_ms: u64,
        #[serde(default = "default_max_delay")]
        max_delay_ms: u64,
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        #[serde(default = "default_jitter")]
        jitter: bool,
    },
}

fn default_fixed_delay() -> u64 {
    5000
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Exponential {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempt` (0-based, reset on open).
    ///
    /// Never shorter than [`MIN_RECONNECT_DELAY`], whatever the configuration.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }

    pub fn delay_with<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        self.raw_delay(attempt, rng).max(MIN_RECONNECT_DELAY)
    }

    fn raw_delay<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        match *self {
            ReconnectPolicy::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            ReconnectPolicy::Exponential {
                initial_delay_ms,
                max_delay_ms,
                multiplier,
                jitter,
            } => {
                let base = Self::capped(initial_delay_ms, max_delay_ms, multiplier, attempt);
                if !jitter || base < 2 {
                    return Duration::from_millis(base);
                }
                // Equal jitter: half fixed, half random
                let half = base / 2;
                let spread = base - half;
                Duration::from_millis(half + rng.gen_range(0..=spread))
            }
        }
    }

    /// Upper bound of the delay for `attempt`, before jitter.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        match *self {
            ReconnectPolicy::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            ReconnectPolicy::Exponential {
                initial_delay_ms,
                max_delay_ms,
                multiplier,
                ..
            } => Duration::from_millis(Self::capped(
                initial_delay_ms,
                max_delay_ms,
                multiplier,
                attempt,
            )),
        }
    }

    fn capped(initial: u64, max: u64, multiplier: f64, attempt: u32) -> u64 {
        let factor = multiplier.max(1.0).powi(attempt.min(64) as i32);
        let raw = initial as f64 * factor;
        if !raw.is_finite() || raw >= max as f64 {
            max
        } else {
            raw as u64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn exponential(jitter: bool) -> ReconnectPolicy {
        ReconnectPolicy::Exponential {
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter,
        }
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        let policy = ReconnectPolicy::Fixed { delay_ms: 5000 };
        for attempt in [0, 1, 5, 100] {
            assert_eq!(policy.delay(attempt), Duration::from_millis(5000));
        }
    }

    #[test]
    fn test_exponential_without_jitter() {
        let policy = exponential(false);
        let delays: Vec<u64> = (0..7).map(|a| policy.delay(a).as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 30000, 30000]);
    }

    #[test]
    fn test_ceiling_is_non_decreasing_and_capped() {
        let policy = exponential(true);
        let mut previous = Duration::ZERO;
        for attempt in 0..200 {
            let ceiling = policy.ceiling(attempt);
            assert!(ceiling >= previous);
            assert!(ceiling <= Duration::from_millis(30_000));
            previous = ceiling;
        }
    }

    #[test]
    fn test_jitter_stays_within_bounds_and_never_zero() {
        let policy = exponential(true);
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 0..20 {
            let ceiling = policy.ceiling(attempt);
            for _ in 0..50 {
                let delay = policy.delay_with(attempt, &mut rng);
                assert!(delay > Duration::ZERO);
                assert!(delay >= ceiling / 2);
                assert!(delay <= ceiling);
            }
        }
    }

    #[test]
    fn test_zero_delays_are_floored() {
        let fixed = ReconnectPolicy::Fixed { delay_ms: 0 };
        assert_eq!(fixed.delay(0), MIN_RECONNECT_DELAY);

        let exponential = ReconnectPolicy::Exponential {
            initial_delay_ms: 0,
            max_delay_ms: 0,
            multiplier: 2.0,
            jitter: true,
        };
        for attempt in 0..5 {
            assert_eq!(exponential.delay(attempt), MIN_RECONNECT_DELAY);
        }

        // Configured delays above the floor are untouched
        assert_eq!(
            ReconnectPolicy::Fixed { delay_ms: 250 }.delay(3),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let policy = exponential(false);
        assert_eq!(policy.delay(u32::MAX), Duration::from_millis(30_000));
    }

    #[test]
    fn test_default_policy_serialization() {
        let value = serde_json::to_value(ReconnectPolicy::default()).unwrap();
        assert_eq!(value["strategy"], "exponential");
        assert_eq!(value["initial_delay_ms"], 1000);
        assert_eq!(value["max_delay_ms"], 30000);
        assert_eq!(value["jitter"], true);
    }
}

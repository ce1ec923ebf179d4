use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reconnect timing and retry limits
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Attempts allowed after a failure before giving up
    pub max_attempts: u32,

    /// Delay before the first attempt
    pub base_delay_ms: u64,

    /// Growth factor applied after each attempt
    pub multiplier: f64,

    /// Upper bound for the delay
    pub max_delay_ms: u64,
}

impl ReconnectConfig {
    /// Reject settings that cannot produce a usable delay sequence
    pub fn validate(&self) -> Result<(), String> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(format!(
                "reconnect.multiplier must be a finite number >= 1.0, got {}",
                self.multiplier
            ));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(format!(
                "reconnect.base_delay_ms ({}) exceeds reconnect.max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            ));
        }
        Ok(())
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 3000,
            multiplier: 1.5,
            max_delay_ms: 30_000,
        }
    }
}

/// Exponential backoff state for the connection task.
///
/// The Nth attempt waits `min(base * multiplier^(N-1), max)`.
#[derive(Clone, Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempts: u32,
    current_delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        let current_delay = Duration::from_millis(config.base_delay_ms);
        Self {
            config,
            attempts: 0,
            current_delay,
        }
    }

    /// Advance after a failure. Returns the delay before the next attempt, or
    /// `None` once the attempt budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.config.max_attempts {
            return None;
        }

        let delay = self.current_delay;
        let max = Duration::from_millis(self.config.max_delay_ms);
        // Saturate at the cap when the product overflows or is not finite
        let grown = self.current_delay.as_secs_f64() * self.config.multiplier.max(1.0);
        self.current_delay = Duration::try_from_secs_f64(grown)
            .unwrap_or(max)
            .min(max);
        self.attempts += 1;

        Some(delay.min(max))
    }

    /// Back to the initial delay after a successful open
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.current_delay = Duration::from_millis(self.config.base_delay_ms);
    }

    /// Attempts scheduled since the last successful open
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.config.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_attempts: u32) -> ReconnectConfig {
        ReconnectConfig {
            max_attempts,
            base_delay_ms: 1000,
            multiplier: 2.0,
            max_delay_ms: 5000,
        }
    }

    #[test]
    fn test_delay_sequence() {
        let mut policy = ReconnectPolicy::new(config(5));
        let delays: Vec<u64> = std::iter::from_fn(|| policy.next_delay())
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 5000, 5000]);
        assert!(policy.is_exhausted());
        assert_eq!(policy.next_delay(), None);
    }

    #[test]
    fn test_default_delays_match_formula() {
        let cfg = ReconnectConfig::default();
        let mut policy = ReconnectPolicy::new(cfg.clone());
        for n in 1..=cfg.max_attempts {
            let expected = (cfg.base_delay_ms as f64 * cfg.multiplier.powi(n as i32 - 1))
                .min(cfg.max_delay_ms as f64);
            let delay = policy.next_delay().unwrap().as_millis() as f64;
            assert!((delay - expected).abs() < 1.0, "attempt {n}: {delay} vs {expected}");
        }
        assert_eq!(policy.next_delay(), None);
    }

    #[test]
    fn test_reset_restores_initial_delay() {
        let mut policy = ReconnectPolicy::new(config(5));
        policy.next_delay();
        policy.next_delay();
        assert_eq!(policy.attempts(), 2);

        policy.reset();
        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_huge_multiplier_saturates_at_max() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig {
            multiplier: 1e300,
            ..config(4)
        });
        let delays: Vec<u64> = std::iter::from_fn(|| policy.next_delay())
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 5000, 5000, 5000]);

        let mut policy = ReconnectPolicy::new(ReconnectConfig {
            multiplier: f64::INFINITY,
            ..config(2)
        });
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(1000)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_validate_rejects_unusable_config() {
        assert!(ReconnectConfig::default().validate().is_ok());
        for multiplier in [f64::INFINITY, f64::NAN, 0.5] {
            let cfg = ReconnectConfig {
                multiplier,
                ..ReconnectConfig::default()
            };
            assert!(cfg.validate().is_err(), "multiplier {multiplier} accepted");
        }
        let cfg = ReconnectConfig {
            base_delay_ms: 60_000,
            ..ReconnectConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_attempts_never_retries() {
        let mut policy = ReconnectPolicy::new(config(0));
        assert_eq!(policy.next_delay(), None);
    }
}

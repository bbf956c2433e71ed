use crate::Config;
use std::hint;
use std::thread;

/// Adaptive backoff for a handle waiting on its peer (Crossbeam-style).
///
/// Progressively increases wait time: spin with PAUSE → yield to OS → give up.
/// The limits come from [`Config::spin_limit`] and [`Config::yield_limit`].
#[derive(Debug)]
pub struct Backoff {
    step: u32,
    spin_limit: u32,
    yield_limit: u32,
}

impl Backoff {
    /// Creates a backoff with the default limits (64 spins, then 4 yields).
    #[inline]
    pub fn new() -> Self {
        let config = Config::default();
        Self::with_limits(config.spin_limit, config.yield_limit)
    }

    /// Creates a backoff that spins for `2^spin_limit` iterations at most per
    /// step and gives up once `yield_limit` steps have elapsed.
    #[inline]
    pub fn with_limits(spin_limit: u32, yield_limit: u32) -> Self {
        Self {
            step: 0,
            spin_limit,
            yield_limit: yield_limit.max(spin_limit),
        }
    }

    /// Creates a backoff using the limits of `config`.
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self::with_limits(config.spin_limit, config.yield_limit)
    }

    /// Light spin with PAUSE hints.
    #[inline]
    pub fn spin(&mut self) {
        let spins = 1u32 << self.step.min(self.spin_limit).min(31);
        for _ in 0..spins {
            hint::spin_loop();
        }
        if self.step <= self.spin_limit {
            self.step += 1;
        }
    }

    /// Heavier backoff: spin while under the spin limit, then yield.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= self.spin_limit {
            self.spin();
        } else {
            thread::yield_now();
            if self.step <= self.yield_limit {
                self.step += 1;
            }
        }
    }

    /// Check if we've exhausted patience.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.step > self.yield_limit
    }

    /// Reset for next wait cycle.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_progression() {
        let mut b = Backoff::new();
        assert_eq!(b.step, 0);

        b.spin();
        assert!(b.step > 0);

        while !b.is_completed() {
            b.snooze();
        }
        assert!(b.step > b.yield_limit);

        b.reset();
        assert_eq!(b.step, 0);
    }

    #[test]
    fn test_backoff_short_limits() {
        let mut b = Backoff::from_config(&Config::new(16, false).with_backoff(1, 2));
        let mut snoozes = 0;
        while !b.is_completed() {
            b.snooze();
            snoozes += 1;
        }
        // steps 0 and 1 spin, step 2 yields, step 3 completes
        assert_eq!(snoozes, 3);
    }

    #[test]
    fn test_yield_limit_never_below_spin_limit() {
        let b = Backoff::with_limits(5, 1);
        assert_eq!(b.yield_limit, 5);
    }
}

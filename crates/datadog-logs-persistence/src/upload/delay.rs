// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::config::UploadConfig;
use std::time::Duration;

/// Interval to wait between two upload attempts.
///
/// Accepted uploads shrink the interval geometrically down to `min`. A failed
/// upload backs off to `max` for exactly one wait, then the interval restarts
/// from `default`.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadDelay {
    current: Duration,
    default: Duration,
    min: Duration,
    max: Duration,
    decrease_factor: f64,
    boosted: bool,
}

impl UploadDelay {
    /// Swapped `min`/`max` bounds are reordered, and `default` is kept within them.
    pub fn new(default: Duration, min: Duration, max: Duration, decrease_factor: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let default = default.clamp(min, max);
        Self {
            current: default,
            default,
            min,
            max,
            decrease_factor,
            boosted: false,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(
            config.default_upload_delay,
            config.min_upload_delay,
            config.max_upload_delay,
            config.upload_delay_decrease_factor,
        )
    }

    pub fn next_delay(&mut self) -> Duration {
        if self.boosted {
            self.boosted = false;
            self.current = self.default;
            return self.max;
        }
        self.current
    }

    pub fn decrease(&mut self) {
        self.current = self.current.mul_f64(self.decrease_factor).max(self.min);
    }

    pub fn increase_once(&mut self) {
        self.boosted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DEFAULT: Duration = Duration::from_secs(5);
    const MIN: Duration = Duration::from_secs(1);
    const MAX: Duration = Duration::from_secs(20);
    const FACTOR: f64 = 0.9;

    fn delay() -> UploadDelay {
        UploadDelay::new(DEFAULT, MIN, MAX, FACTOR)
    }

    #[test]
    fn test_when_not_modified_returns_default_delay() {
        let mut delay = delay();
        assert_eq!(delay.next_delay(), DEFAULT);
        assert_eq!(delay.next_delay(), DEFAULT);
    }

    #[test]
    fn test_decreasing_goes_down_to_minimum_delay() {
        let mut delay = delay();
        let mut previous = delay.next_delay();

        while previous != MIN {
            delay.decrease();
            let next = delay.next_delay();
            assert!(next <= previous);
            assert!(next >= MIN);
            if next != MIN {
                let ratio = next.as_secs_f64() / previous.as_secs_f64();
                assert!((ratio - FACTOR).abs() < 0.1, "ratio was {ratio}");
            }
            previous = next;
        }

        delay.decrease();
        assert_eq!(delay.next_delay(), MIN);
    }

    #[test]
    fn test_increased_once_returns_max_once_then_default() {
        let mut delay = delay();
        delay.decrease();
        delay.increase_once();

        assert_eq!(delay.next_delay(), MAX);
        assert_eq!(delay.next_delay(), DEFAULT);
        assert_eq!(delay.next_delay(), DEFAULT);
    }

    #[test]
    fn test_increase_is_not_cumulative() {
        let mut delay = delay();
        delay.increase_once();
        delay.increase_once();

        assert_eq!(delay.next_delay(), MAX);
        assert_eq!(delay.next_delay(), DEFAULT);
    }

    #[test]
    fn test_swapped_bounds_are_reordered() {
        let mut delay = UploadDelay::new(Duration::from_secs(30), MAX, MIN, FACTOR);
        assert_eq!(delay.next_delay(), MAX);

        delay.increase_once();
        assert_eq!(delay.next_delay(), MAX);
        for _ in 0..100 {
            delay.decrease();
        }
        assert_eq!(delay.next_delay(), MIN);
    }

    proptest! {
        #[test]
        fn delay_stays_within_bounds(ops in proptest::collection::vec(0u8..3, 0..200)) {
            let mut delay = delay();
            for op in ops {
                match op {
                    0 => delay.decrease(),
                    1 => delay.increase_once(),
                    _ => {
                        let next = delay.next_delay();
                        prop_assert!(next >= MIN && next <= MAX);
                    }
                }
            }
        }
    }
}

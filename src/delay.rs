//! Inter-message pacing
//!
//! Each pause between consecutive sends is drawn uniformly from a validated
//! inclusive range of seconds. The random source is injected so tests can
//! seed it.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::time::Duration;

static DELAY_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)-(\d+)$").expect("Invalid delay regex"));

/// Inclusive bounds, in seconds, for the pause between consecutive sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayBound {
    min: u64,
    max: u64,
}

impl Default for DelayBound {
    fn default() -> Self {
        Self { min: 15, max: 35 }
    }
}

impl DelayBound {
    pub fn new(min: u64, max: u64) -> Result<Self> {
        if min == 0 || max == 0 || min > max {
            return Err(Error::Config(format!("invalid delay range {}-{}", min, max)));
        }
        Ok(Self { min, max })
    }

    /// Parse a `"<min>-<max>"` range, e.g. `"15-35"`
    pub fn parse(s: &str) -> Result<Self> {
        let caps = DELAY_RANGE.captures(s.trim()).ok_or_else(|| {
            Error::Config(format!("invalid delay format: {:?} (use e.g. 15-35)", s))
        })?;

        let min = caps[1]
            .parse()
            .map_err(|_| Error::Config(format!("invalid delay minimum: {}", &caps[1])))?;
        let max = caps[2]
            .parse()
            .map_err(|_| Error::Config(format!("invalid delay maximum: {}", &caps[2])))?;

        Self::new(min, max)
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }
}

impl std::fmt::Display for DelayBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Draw the next inter-message delay, uniform over the inclusive bound
pub fn next_delay<R: Rng>(bound: DelayBound, rng: &mut R) -> Duration {
    Duration::from_secs(rng.gen_range(bound.min..=bound.max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_valid_range() {
        let bound = DelayBound::parse("15-35").unwrap();
        assert_eq!(bound.min(), 15);
        assert_eq!(bound.max(), 35);
    }

    #[test]
    fn test_parse_single_value_range() {
        let bound = DelayBound::parse("5-5").unwrap();
        assert_eq!(bound.min(), 5);
        assert_eq!(bound.max(), 5);
    }

    #[test]
    fn test_parse_rejects_inverted_range() {
        assert!(DelayBound::parse("35-15").is_err());
    }

    #[test]
    fn test_parse_rejects_zero() {
        assert!(DelayBound::parse("0-10").is_err());
        assert!(DelayBound::parse("0-0").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(DelayBound::parse("").is_err());
        assert!(DelayBound::parse("15").is_err());
        assert!(DelayBound::parse("15-").is_err());
        assert!(DelayBound::parse("-35").is_err());
        assert!(DelayBound::parse("abc-def").is_err());
        assert!(DelayBound::parse("1-2-3").is_err());
        assert!(DelayBound::parse("1.5-3").is_err());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert!(DelayBound::parse(" 15-35 ").is_ok());
    }

    #[test]
    fn test_display_round_trips() {
        let bound = DelayBound::new(15, 35).unwrap();
        assert_eq!(DelayBound::parse(&bound.to_string()).unwrap(), bound);
    }

    #[test]
    fn test_degenerate_range_is_constant() {
        let bound = DelayBound::new(7, 7).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10 {
            assert_eq!(next_delay(bound, &mut rng), Duration::from_secs(7));
        }
    }

    proptest! {
        #[test]
        fn prop_next_delay_within_bound(
            min in 1u64..500,
            span in 0u64..500,
            seed in any::<u64>(),
        ) {
            let bound = DelayBound::new(min, min + span).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            let secs = next_delay(bound, &mut rng).as_secs();
            prop_assert!(secs >= bound.min() && secs <= bound.max());
        }

        #[test]
        fn prop_parse_accepts_valid_ranges(min in 1u64..1000, span in 0u64..1000) {
            let s = format!("{}-{}", min, min + span);
            let bound = DelayBound::parse(&s).unwrap();
            prop_assert_eq!(bound.min(), min);
            prop_assert_eq!(bound.max(), min + span);
        }
    }
}

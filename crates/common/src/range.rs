//! Inclusive integer ranges from config (`[start, end]`)

use std::time::Duration;

use rand::RngExt;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Inclusive `[start, end]` interval.
///
/// Used for pauses (seconds) and for the mutual-subscription follower target
/// (a count). Deserializes from a two-element TOML array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<u64>")]
pub struct Range {
    pub start: u64,
    pub end: u64,
}

impl Range {
    pub const ZERO: Range = Range { start: 0, end: 0 };

    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// A range that always yields `value`.
    pub fn fixed(value: u64) -> Self {
        Self::new(value, value)
    }

    /// Reject ranges whose start is past their end.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.start > self.end {
            return Err(Error::InvalidRange {
                name: name.to_string(),
                reason: format!(
                    "start ({}) is greater than end ({})",
                    self.start, self.end
                ),
            });
        }
        Ok(())
    }

    /// Draw a value uniformly from the range, both ends inclusive.
    ///
    /// A reversed range is sampled as if its ends were swapped.
    pub fn sample_with<R: RngExt + ?Sized>(&self, rng: &mut R) -> u64 {
        let (lo, hi) = if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        };
        if lo == hi {
            return lo;
        }
        rng.random_range(lo..=hi)
    }

    pub fn sample(&self) -> u64 {
        self.sample_with(&mut rand::rng())
    }

    /// Sample the range as a number of seconds.
    pub fn sample_duration(&self) -> Duration {
        Duration::from_secs(self.sample())
    }
}

impl TryFrom<Vec<u64>> for Range {
    type Error = String;

    fn try_from(values: Vec<u64>) -> std::result::Result<Self, Self::Error> {
        match values.as_slice() {
            [start, end] => Ok(Range::new(*start, *end)),
            other => Err(format!(
                "range must have exactly 2 values, got {}",
                other.len()
            )),
        }
    }
}

//! Meter (time signature) and the notation preferences derived from it.
//!
//! Meter does not take part in building of rhythm trees. It only tells
//! the notation mapper, how many parts a node of given depth "wants" to be
//! split into, and which note length a leaf of given depth gets.
//!
//! Subdivision is binary: the measure is split into `numerator` beats,
//! every beat into 2, and so on.
//!
//! # Example
//!
//! ```
//! use score_rhythm::primitives::{Meter, Rational};
//!
//! let meter: Meter = "3/4".parse().unwrap();
//! assert_eq!(meter.measure_length(), Rational::new(3, 4).unwrap());
//! assert_eq!(meter.preferred_subdivision(0), 3);
//! assert_eq!(meter.preferred_subdivision(1), 2);
//! assert_eq!(meter.preferred_leaf_length(1), Rational::new(1, 4).unwrap());
//! assert_eq!(meter.preferred_leaf_length(2), Rational::new(1, 8).unwrap());
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{Rational, TimeError, TimeResult};

/// Amount of parts every beat (and every part below it) is split into.
const BEAT_SUBDIVISION: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(u32, u32)", into = "(u32, u32)")]
pub struct Meter {
    numerator: u32,
    denominator: u32,
}
impl Meter {
    /// Fails with [`TimeError::InvalidMeter`] if any part is zero.
    pub fn new(numerator: u32, denominator: u32) -> TimeResult<Self> {
        if numerator == 0 || denominator == 0 {
            return Err(TimeError::InvalidMeter {
                numerator,
                denominator,
            });
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }
    /// 4/4
    pub fn common_time() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }
    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    /// Length of one measure in whole notes.
    pub fn measure_length(&self) -> Rational {
        Rational::from_unsigned(self.numerator, self.denominator.into())
    }

    /// Number of parts a node at `depth` is preferably split into.
    ///
    /// Root (depth 0) is split into beats, everything below in halves.
    pub fn preferred_subdivision(&self, depth: usize) -> usize {
        match depth {
            0 => self.numerator as usize,
            _ => BEAT_SUBDIVISION,
        }
    }

    /// Note length of a leaf at `depth`, when all its ancestors follow
    /// [`Meter::preferred_subdivision`].
    ///
    /// Whole measure at depth 0, beat at depth 1, half of beat at depth 2...
    /// Extremely deep levels saturate at `1/i64::MAX` instead of overflowing.
    pub fn preferred_leaf_length(&self, depth: usize) -> Rational {
        match depth {
            0 => self.measure_length(),
            _ => {
                let factor = u32::try_from(depth - 1)
                    .ok()
                    .and_then(|exp| (BEAT_SUBDIVISION as u64).checked_pow(exp))
                    .unwrap_or(u64::MAX);
                Rational::from_unsigned(
                    1,
                    u64::from(self.denominator).saturating_mul(factor),
                )
            }
        }
    }
}
impl Default for Meter {
    fn default() -> Self {
        Self::common_time()
    }
}
impl TryFrom<(u32, u32)> for Meter {
    type Error = TimeError;
    fn try_from((numerator, denominator): (u32, u32)) -> Result<Self, Self::Error> {
        Self::new(numerator, denominator)
    }
}
impl From<Meter> for (u32, u32) {
    fn from(meter: Meter) -> Self {
        (meter.numerator, meter.denominator)
    }
}
impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
impl FromStr for Meter {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_error = |reason: String| TimeError::Parse {
            input: s.to_string(),
            reason,
        };
        let (numerator, denominator) = s
            .split_once('/')
            .ok_or_else(|| parse_error("expected `numerator/denominator`".into()))?;
        let numerator = numerator
            .trim()
            .parse::<u32>()
            .map_err(|e| parse_error(e.to_string()))?;
        let denominator = denominator
            .trim()
            .parse::<u32>()
            .map_err(|e| parse_error(e.to_string()))?;
        Self::new(numerator, denominator)
    }
}

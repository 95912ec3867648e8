//! Money in integer minor units.
//!
//! Prices and budgets travel as `f64` major units on the wire, but every
//! accumulation (budget spend, stats) happens on [`MinorUnits`] so that
//! concurrent deductions sum exactly.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Minor units per major unit (cents).
pub const MINOR_PER_MAJOR: i64 = 100;

/// An amount of money in minor units (1/100 of the major unit).
///
/// ```rust
/// use kernel::money::MinorUnits;
///
/// let price = MinorUnits::from_major(1.005);
/// assert_eq!(price.get(), 101);
/// assert_eq!(MinorUnits::new(250).to_major(), 2.5);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(i64);

impl MinorUnits {
    pub const ZERO: MinorUnits = MinorUnits(0);

    #[inline]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Convert a major-unit amount, rounding half away from zero.
    ///
    /// Non-finite input maps to zero; callers validate positivity separately.
    pub fn from_major(major: f64) -> Self {
        if !major.is_finite() {
            return Self::ZERO;
        }
        // Nudge by a tiny epsilon so 1.005 (stored as 1.00499...) rounds up.
        let scaled = major * MINOR_PER_MAJOR as f64;
        let nudged = scaled + scaled.signum() * 1e-9;
        Self(nudged.round() as i64)
    }

    #[inline]
    pub const fn get(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn to_major(self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR as f64
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn saturating_sub(self, other: MinorUnits) -> MinorUnits {
        MinorUnits(self.0.saturating_sub(other.0))
    }
}

impl Add for MinorUnits {
    type Output = MinorUnits;

    fn add(self, rhs: MinorUnits) -> MinorUnits {
        MinorUnits(self.0.saturating_add(rhs.0))
    }
}

impl Sub for MinorUnits {
    type Output = MinorUnits;

    fn sub(self, rhs: MinorUnits) -> MinorUnits {
        MinorUnits(self.0.saturating_sub(rhs.0))
    }
}

impl From<i64> for MinorUnits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_major())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_major_rounds() {
        assert_eq!(MinorUnits::from_major(1.0).get(), 100);
        assert_eq!(MinorUnits::from_major(0.01).get(), 1);
        assert_eq!(MinorUnits::from_major(1.005).get(), 101);
        assert_eq!(MinorUnits::from_major(0.004).get(), 0);
        assert_eq!(MinorUnits::from_major(f64::NAN).get(), 0);
    }

    #[test]
    fn test_arithmetic_and_display() {
        let a = MinorUnits::new(150);
        let b = MinorUnits::new(25);
        assert_eq!((a + b).get(), 175);
        assert_eq!((a - b).get(), 125);
        assert_eq!(a.to_string(), "1.50");
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&MinorUnits::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}

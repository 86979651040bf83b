//! Rational durations
//!
//! Durations are exact rationals (whole-note units), so a quarter note is
//! 1/4 and a dotted eighth is 3/16. Tuplet multipliers are the same type.

use num_rational::Ratio;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};

/// A duration (or multiplier) in whole-note units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(Ratio<i64>);

impl Duration {
    pub fn new(numerator: i64, denominator: i64) -> Self {
        assert!(denominator != 0, "duration denominator must be nonzero");
        Duration(Ratio::new(numerator, denominator))
    }

    pub fn zero() -> Self {
        Duration(Ratio::zero())
    }

    pub fn numerator(&self) -> i64 {
        *self.0.numer()
    }

    pub fn denominator(&self) -> i64 {
        *self.0.denom()
    }

    pub fn ratio(&self) -> Ratio<i64> {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn abs(&self) -> Duration {
        Duration(self.0.abs())
    }

    pub fn to_f64(&self) -> f64 {
        *self.0.numer() as f64 / *self.0.denom() as f64
    }

    /// Whether a single notehead can carry this duration
    /// (power-of-two denominator, numerator 1, 3 or 7).
    pub fn is_assignable(&self) -> bool {
        let d = *self.0.denom();
        let n = *self.0.numer();
        n > 0 && d > 0 && (d & (d - 1)) == 0 && matches!(n, 1 | 3 | 7)
    }

    /// LilyPond duration string for an assignable duration
    /// (e.g. 1/4 → "4", 3/16 → "8.", 7/32 → "8..").
    pub fn lilypond_string(&self) -> Option<String> {
        if !self.is_assignable() {
            return None;
        }
        let n = *self.0.numer();
        let d = *self.0.denom();
        let (base, dots) = match n {
            1 => (d, 0),
            3 => (d / 2, 1),
            7 => (d / 4, 2),
            _ => return None,
        };
        if base < 1 {
            return None;
        }
        let mut s = base.to_string();
        for _ in 0..dots {
            s.push('.');
        }
        Some(s)
    }
}

impl std::ops::Add for Duration {
    type Output = Duration;
    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Duration {
    type Output = Duration;
    fn sub(self, rhs: Duration) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Duration {
    type Output = Duration;
    fn mul(self, rhs: Duration) -> Duration {
        Duration(self.0 * rhs.0)
    }
}

impl std::ops::Div for Duration {
    type Output = Duration;
    fn div(self, rhs: Duration) -> Duration {
        Duration(self.0 / rhs.0)
    }
}

impl std::iter::Sum for Duration {
    fn sum<I: Iterator<Item = Duration>>(iter: I) -> Duration {
        iter.fold(Duration::zero(), |acc, d| acc + d)
    }
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0.numer(), self.0.denom())
    }
}

// Serialize as a (numerator, denominator) pair so persisted state stays
// readable.
impl Serialize for Duration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.numerator(), self.denominator()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (n, d) = <(i64, i64)>::deserialize(deserializer)?;
        if d == 0 {
            return Err(serde::de::Error::custom("duration denominator must be nonzero"));
        }
        Ok(Duration::new(n, d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lilypond_strings() {
        assert_eq!(Duration::new(1, 4).lilypond_string(), Some("4".to_string()));
        assert_eq!(Duration::new(2, 8).lilypond_string(), Some("4".to_string()));
        assert_eq!(Duration::new(3, 16).lilypond_string(), Some("8.".to_string()));
        assert_eq!(Duration::new(7, 32).lilypond_string(), Some("8..".to_string()));
        assert_eq!(Duration::new(5, 16).lilypond_string(), None);
    }

    #[test]
    fn test_arithmetic_reduces() {
        let d = Duration::new(1, 4) + Duration::new(1, 4);
        assert_eq!(d, Duration::new(1, 2));
        assert_eq!(d.denominator(), 2);
    }
}

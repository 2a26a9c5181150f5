//! Exact rational control gains.
//!
//! Gains are stored and returned as the `(numerator, denominator)` pair they
//! were set with. Applying a gain uses 64-bit integer arithmetic only.

use serde::{Deserialize, Serialize};

use super::error::CommandError;

/// Which PID gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GainKind {
    /// Proportional.
    Kp,
    /// Integral.
    Ki,
}

/// Signed 32-bit rational `num / den` with `den != 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(i32, i32)", into = "(i32, i32)")]
pub struct Rational {
    num: i32,
    den: i32,
}

impl Rational {
    /// Zero gain.
    pub const ZERO: Self = Self { num: 0, den: 1 };

    /// Create a rational gain. Rejects a zero denominator.
    ///
    /// The pair is stored as given, without reduction.
    pub const fn new(num: i32, den: i32) -> Result<Self, CommandError> {
        if den == 0 {
            return Err(CommandError::ZeroDenominator);
        }
        Ok(Self { num, den })
    }

    /// Build a gain in a constant expression; a zero denominator fails to compile.
    pub const fn constant(num: i32, den: i32) -> Self {
        assert!(den != 0, "gain denominator must be nonzero");
        Self { num, den }
    }

    #[inline]
    pub const fn numerator(&self) -> i32 {
        self.num
    }

    #[inline]
    pub const fn denominator(&self) -> i32 {
        self.den
    }

    /// `(numerator, denominator)`.
    #[inline]
    pub const fn parts(&self) -> (i32, i32) {
        (self.num, self.den)
    }

    /// `x * num / den`, truncated toward zero.
    #[inline]
    pub const fn apply(&self, x: i64) -> i64 {
        match x.saturating_mul(self.num as i64).checked_div(self.den as i64) {
            Some(v) => v,
            // i64::MIN / -1
            None => i64::MAX,
        }
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<(i32, i32)> for Rational {
    type Error = CommandError;

    fn try_from((num, den): (i32, i32)) -> Result<Self, Self::Error> {
        Self::new(num, den)
    }
}

impl From<Rational> for (i32, i32) {
    fn from(r: Rational) -> Self {
        r.parts()
    }
}

impl core::fmt::Display for Rational {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_exact() {
        let g = Rational::new(3, 7).unwrap();
        assert_eq!(g.parts(), (3, 7));
        assert_eq!(g.to_string(), "3/7");
    }

    #[test]
    fn unreduced_pair_is_preserved() {
        let g = Rational::new(6, 14).unwrap();
        assert_eq!(g.parts(), (6, 14));
    }

    #[test]
    fn zero_denominator_rejected() {
        assert_eq!(Rational::new(1, 0), Err(CommandError::ZeroDenominator));
    }

    #[test]
    fn apply_truncates_toward_zero() {
        let g = Rational::new(3, 7).unwrap();
        assert_eq!(g.apply(7), 3);
        assert_eq!(g.apply(10), 4);
        assert_eq!(g.apply(-10), -4);
        assert_eq!(Rational::ZERO.apply(1_000), 0);
    }

    #[test]
    fn negative_denominator_allowed() {
        let g = Rational::new(1, -2).unwrap();
        assert_eq!(g.apply(10), -5);
    }

    #[test]
    fn deserializes_from_pair() {
        #[derive(Deserialize)]
        struct Wrapper {
            kp: Rational,
        }
        let w: Wrapper = toml::from_str("kp = [3, 7]").unwrap();
        assert_eq!(w.kp.parts(), (3, 7));
        assert!(toml::from_str::<Wrapper>("kp = [3, 0]").is_err());
    }
}

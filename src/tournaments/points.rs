use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign},
};

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// A quantity counted in halves: wins (where a tied match is worth half a
/// win) and votes (where a judge who cannot separate the teams gives half a
/// vote to each).
///
/// Stored as an integer count of half-points, so that equality (which tie
/// detection depends on) is exact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HalfPoints(i64);

impl HalfPoints {
    pub const ZERO: HalfPoints = HalfPoints(0);
    pub const HALF: HalfPoints = HalfPoints(1);
    pub const ONE: HalfPoints = HalfPoints(2);

    pub fn from_halves(halves: i64) -> Self {
        HalfPoints(halves)
    }

    pub fn from_whole(whole: i64) -> Self {
        HalfPoints(whole * 2)
    }

    /// `None` if `whole` points cannot be counted in halves.
    pub fn checked_from_whole(whole: i64) -> Option<Self> {
        whole.checked_mul(2).map(HalfPoints)
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(HalfPoints)
    }

    pub fn halves(self) -> i64 {
        self.0
    }

    /// The number of whole points, rounding down.
    pub fn whole_part(self) -> i64 {
        self.0.div_euclid(2)
    }

    /// Whether there is half a point left over after [`Self::whole_part`].
    pub fn has_half(self) -> bool {
        self.0.rem_euclid(2) == 1
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.0) / Decimal::TWO
    }

    /// Converts a decimal, provided that it is a multiple of one half (and
    /// that the number of halves fits in an `i64`).
    pub fn try_from_decimal(value: Decimal) -> Option<Self> {
        let doubled = value.checked_mul(Decimal::TWO)?;
        if doubled.fract().is_zero() {
            i64::try_from(doubled).ok().map(HalfPoints)
        } else {
            None
        }
    }
}

impl Add for HalfPoints {
    type Output = HalfPoints;

    /// Saturates at the bounds of `i64`; use [`HalfPoints::checked_add`]
    /// where overflow must be noticed.
    fn add(self, rhs: Self) -> Self::Output {
        HalfPoints(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for HalfPoints {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for HalfPoints {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(HalfPoints::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a HalfPoints> for HalfPoints {
    fn sum<I: Iterator<Item = &'a HalfPoints>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for HalfPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal().normalize())
    }
}

/// Serialized as a JSON number (`2.5`), which is exact for halves.
impl Serialize for HalfPoints {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.0 as f64 / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn splits_into_whole_and_half() {
        let p = HalfPoints::from_halves(5);
        assert_eq!(p.whole_part(), 2);
        assert!(p.has_half());
        assert_eq!(p.to_string(), "2.5");
        assert_eq!(HalfPoints::from_whole(3).to_string(), "3");

        // negative adjustments round towards negative infinity
        let n = HalfPoints::from_halves(-1);
        assert_eq!(n.whole_part(), -1);
        assert!(n.has_half());
        assert_eq!(n.to_string(), "-0.5");
    }

    #[test]
    fn decimal_conversion_requires_halves() {
        let d = Decimal::from_str("1.5").unwrap();
        assert_eq!(
            HalfPoints::try_from_decimal(d),
            Some(HalfPoints::from_halves(3))
        );
        assert_eq!(HalfPoints::from_halves(3).to_decimal(), d);
        assert_eq!(
            HalfPoints::try_from_decimal(Decimal::from_str("0.25").unwrap()),
            None
        );
        assert_eq!(HalfPoints::try_from_decimal(Decimal::MAX), None);
        assert_eq!(
            HalfPoints::try_from_decimal(Decimal::from(i64::MAX)),
            None
        );
    }

    #[test]
    fn checked_arithmetic_stops_at_the_bounds() {
        assert_eq!(HalfPoints::checked_from_whole(i64::MAX), None);
        assert_eq!(
            HalfPoints::checked_from_whole(2),
            Some(HalfPoints::from_halves(4))
        );
        assert_eq!(
            HalfPoints::from_halves(i64::MAX).checked_add(HalfPoints::HALF),
            None
        );
        assert_eq!(
            HalfPoints::ONE.checked_add(HalfPoints::HALF),
            Some(HalfPoints::from_halves(3))
        );
        assert_eq!(
            HalfPoints::from_halves(i64::MAX) + HalfPoints::ONE,
            HalfPoints::from_halves(i64::MAX)
        );
    }

    #[test]
    fn serializes_as_number() {
        assert_eq!(
            serde_json::to_string(&HalfPoints::from_halves(3)).unwrap(),
            "1.5"
        );
    }
}

use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Settlement currency for all amounts passing through the engine. Orders carry their own currency
/// code, but every amount is an integer number of minor units (cents) in that currency.
pub const DEFAULT_CURRENCY_CODE: &str = "usd";

//--------------------------------------     MinorUnits       --------------------------------------------------------
/// A monetary amount in integer minor currency units (e.g. cents). All arithmetic in the engine is
/// done on this type so that fee splits and payout sums are exact.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct MinorUnits(i64);

op!(binary MinorUnits, Add, add);
op!(binary MinorUnits, Sub, sub);
op!(inplace MinorUnits, SubAssign, sub_assign);
op!(unary MinorUnits, Neg, neg);

impl Mul<i64> for MinorUnits {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for MinorUnits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in minor currency units: {0}")]
pub struct MinorUnitsConversionError(String);

impl From<i64> for MinorUnits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for MinorUnits {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MinorUnits {}

impl TryFrom<u64> for MinorUnits {
    type Error = MinorUnitsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MinorUnitsConversionError(format!("Value {value} is too large to convert to MinorUnits")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl MinorUnits {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Clamps this amount to at most `other`.
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_formats_minor_units() {
        assert_eq!(MinorUnits::from(8000).to_string(), "80.00");
        assert_eq!(MinorUnits::from(5).to_string(), "0.05");
        assert_eq!(MinorUnits::from(-1234).to_string(), "-12.34");
    }

    #[test]
    fn sums_exactly() {
        let total: MinorUnits = [5000, 12000, 7300].into_iter().map(MinorUnits::from).sum();
        assert_eq!(total, MinorUnits::from(24300));
    }

    #[test]
    fn arithmetic() {
        let a = MinorUnits::from(200_000);
        let b = MinorUnits::from(9000);
        assert_eq!((a - b).value(), 191_000);
        assert_eq!((a + b).value(), 209_000);
        assert_eq!((-b).value(), -9000);
        assert_eq!(b.min(a), b);
    }
}

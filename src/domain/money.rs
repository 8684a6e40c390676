use crate::error::EnrollmentError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// A non-negative course price in the major unit of the configured currency.
///
/// Wraps `rust_decimal::Decimal` so totals are computed without float drift and
/// negative prices can never enter the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, EnrollmentError> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(EnrollmentError::InvalidInput(
                "Price must not be negative".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Converts to the provider's smallest currency unit (paise, cents).
    ///
    /// Fails when the price carries more precision than the minor unit.
    pub fn to_minor_units(&self) -> Result<i64, EnrollmentError> {
        let minor = self.0 * Decimal::ONE_HUNDRED;
        if !minor.fract().is_zero() {
            return Err(EnrollmentError::InvalidInput(format!(
                "Price {} cannot be expressed in minor units",
                self.0
            )));
        }
        i64::try_from(minor).map_err(|_| {
            EnrollmentError::InvalidInput(format!("Price {} is out of range", self.0))
        })
    }

    pub fn from_minor_units(minor: i64) -> Result<Self, EnrollmentError> {
        Self::new(Decimal::new(minor, 2).normalize())
    }
}

impl TryFrom<Decimal> for Price {
    type Error = EnrollmentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

impl Add for Price {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Price {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Minor units per major unit (paise per rupee, cents per dollar).
const MINOR_PER_MAJOR: f64 = 100.0;

/// Amount in the smallest currency unit.
///
/// Catalog prices are stored as decimal major units; the payment processor
/// only accepts integers in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(i64);

impl MinorUnits {
    /// Zero amount.
    pub const ZERO: MinorUnits = MinorUnits(0);

    /// Wraps a raw minor-unit amount.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Converts a decimal major-unit price, rounding to the nearest minor unit.
    pub fn from_major(price: f64) -> Result<Self, ValidationError> {
        let minor = (price * MINOR_PER_MAJOR).round();
        if !minor.is_finite() || minor.abs() > i64::MAX as f64 {
            return Err(ValidationError::OutOfBounds {
                field: "price",
                value: price.to_string(),
            });
        }
        Ok(Self(minor as i64))
    }

    /// Raw minor-unit value.
    pub fn value(self) -> i64 {
        self.0
    }

    /// Decimal major-unit value.
    pub fn to_major(self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR
    }

    /// True when nothing has to be charged.
    pub fn is_free(self) -> bool {
        self.0 <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_instead_of_truncating() {
        assert_eq!(MinorUnits::from_major(19.99).unwrap().value(), 1999);
        assert_eq!(MinorUnits::from_major(0.29).unwrap().value(), 29);
    }

    #[test]
    fn rejects_non_finite_prices() {
        assert!(MinorUnits::from_major(f64::NAN).is_err());
        assert!(MinorUnits::from_major(f64::INFINITY).is_err());
    }

    #[test]
    fn zero_and_negative_are_free() {
        assert!(MinorUnits::from_major(0.0).unwrap().is_free());
        assert!(MinorUnits::from_major(-5.0).unwrap().is_free());
        assert!(!MinorUnits::from_major(0.01).unwrap().is_free());
    }
}

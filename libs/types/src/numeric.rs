//! Fixed-point decimal types for prices, quantities and wallet amounts
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Every monetary value carries exactly 8 fractional digits; multiplication
//! truncates toward zero at that scale so repeated settlement can never
//! round funds into existence.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fractional digits carried by every monetary value.
pub const SCALE: u32 = 8;

/// Truncate toward zero at [`SCALE`] and force the scale so values
/// serialize with all 8 fractional digits.
pub fn fixed(value: Decimal) -> Decimal {
    let mut v = value.round_dp_with_strategy(SCALE, RoundingStrategy::ToZero);
    v.rescale(SCALE);
    v
}

/// A strictly positive execution or limit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a price, returning `None` unless `value > 0`.
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(fixed(value)))
        } else {
            None
        }
    }

    pub fn from_u64(value: u64) -> Self {
        Self(fixed(Decimal::from(value)))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Notional value of `quantity` at this price, truncated at 8 digits.
    ///
    /// Returns `None` on mantissa overflow.
    pub fn notional(&self, quantity: Quantity) -> Option<Amount> {
        self.0.checked_mul(quantity.0).map(|v| Amount(fixed(v)))
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str_exact(s)?;
        Self::try_new(value).ok_or_else(|| rust_decimal::Error::ErrorString("price must be positive".to_string()))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A non-negative order quantity in base-asset units.
///
/// Zero is representable because `quantity_remaining` reaches zero on a
/// full fill; order placement rejects zero quantities at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a quantity, returning `None` if `value < 0`.
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ZERO {
            Some(Self(fixed(value)))
        } else {
            None
        }
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Subtract, returning `None` if the result would go negative.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).and_then(Self::try_new)
    }

    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

impl FromStr for Quantity {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str_exact(s)?;
        Self::try_new(value).ok_or_else(|| rust_decimal::Error::ErrorString("quantity must be non-negative".to_string()))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A non-negative wallet amount (either asset of a pair).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount, returning `None` if `value < 0`.
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ZERO {
            Some(Self(fixed(value)))
        } else {
            None
        }
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Subtract, returning `None` if the result would go negative.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).and_then(Self::try_new)
    }
}

impl From<Quantity> for Amount {
    fn from(quantity: Quantity) -> Self {
        Self(quantity.0)
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str_exact(s)?;
        Self::try_new(value).ok_or_else(|| rust_decimal::Error::ErrorString("amount must be non-negative".to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_truncates_toward_zero() {
        let v = Decimal::from_str_exact("0.123456789").unwrap();
        assert_eq!(fixed(v).to_string(), "0.12345678");
    }

    #[test]
    fn test_fixed_pads_scale() {
        let v = Decimal::from_str_exact("1.5").unwrap();
        assert_eq!(fixed(v).to_string(), "1.50000000");
    }

    #[test]
    fn test_price_rejects_non_positive() {
        assert!(Price::try_new(Decimal::ZERO).is_none());
        assert!(Price::try_new(Decimal::from(-1)).is_none());
        assert!(Price::try_new(Decimal::ONE).is_some());
    }

    #[test]
    fn test_notional_truncates() {
        // 0.00000003 * 0.1 = 0.000000003 -> truncated to 0
        let price = Price::from_str("0.1").unwrap();
        let qty = Quantity::from_str("0.00000003").unwrap();
        assert_eq!(price.notional(qty).unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_notional_exact() {
        let price = Price::from_u64(40000);
        let qty = Quantity::from_str("0.5").unwrap();
        assert_eq!(price.notional(qty).unwrap(), Amount::from_str("20000").unwrap());
    }

    #[test]
    fn test_quantity_sub_floor() {
        let a = Quantity::from_str("1.0").unwrap();
        let b = Quantity::from_str("1.5").unwrap();
        assert!(a.checked_sub(b).is_none());
        assert_eq!(b.checked_sub(a).unwrap(), Quantity::from_str("0.5").unwrap());
    }

    #[test]
    fn test_amount_sub_floor() {
        let a = Amount::from_str("10").unwrap();
        let b = Amount::from_str("4").unwrap();
        assert_eq!(a.checked_sub(b).unwrap(), Amount::from_str("6").unwrap());
        assert!(b.checked_sub(a).is_none());
    }

    #[test]
    fn test_serialization_as_string() {
        let price = Price::from_str("40000.5").unwrap();
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "\"40000.50000000\"");
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(back, price);
    }

    #[test]
    fn test_value_equality_ignores_scale() {
        let a = Amount::from_str("1").unwrap();
        let b = Amount::from_str("1.0").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_min() {
        let a = Quantity::from_str("0.3").unwrap();
        let b = Quantity::from_str("0.7").unwrap();
        assert_eq!(a.min(b), a);
        assert_eq!(b.min(a), a);
    }
}

//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

use crate::EcommerceError;

/// Coupon code value object. Codes are matched case-insensitively, so the
/// canonical form is trimmed and uppercased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CouponCode(String);

impl CouponCode {
    pub fn new(value: impl Into<String>) -> Result<Self, EcommerceError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() {
            return Err(EcommerceError::InvalidInput("Please provide a valid coupon code".into()));
        }
        if value.len() > 50 {
            return Err(EcommerceError::InvalidInput("Coupon code is too long".into()));
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Money value object.
///
/// Amounts are fixed-point and always held at two decimal places, rounded
/// half-up, so every derived amount (tax, discount) is already in the
/// smallest currency unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(from = "Decimal", into = "Decimal")]
#[sqlx(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self {
        let mut amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        amount.rescale(2);
        Self(amount)
    }
    pub fn zero() -> Self { Self::new(Decimal::ZERO) }
    pub fn from_major(units: i64) -> Self { Self::new(Decimal::from(units)) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_negative(&self) -> bool { self.0.is_sign_negative() && !self.0.is_zero() }
    pub fn multiply(&self, qty: i32) -> Money { Money::new(self.0 * Decimal::from(qty)) }

    /// `percent`% of this amount, e.g. `percentage(18)` for an 18% tax.
    pub fn percentage(&self, percent: Decimal) -> Money {
        Money::new(self.0 * percent / Decimal::ONE_HUNDRED)
    }
}

impl Default for Money { fn default() -> Self { Self::zero() } }

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self { Self::new(amount) }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self { money.0 }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money::new(self.0 + rhs.0) }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money { Money::new(self.0 - rhs.0) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::zero(), Add::add) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2}", self.0) }
}

/// Positive line quantity. Zero and negative requests never make it into a cart line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Quantity(i32);

impl Quantity {
    pub fn new(value: i64) -> Result<Self, EcommerceError> {
        match i32::try_from(value) {
            Ok(v) if v >= 1 => Ok(Self(v)),
            _ => Err(EcommerceError::InvalidQuantity(value)),
        }
    }
    pub fn value(&self) -> i32 { self.0 }
    pub fn add(&self, other: Quantity) -> Result<Self, EcommerceError> {
        self.0.checked_add(other.0).map(Self).ok_or(EcommerceError::InvalidQuantity(i64::from(self.0) + i64::from(other.0)))
    }
}

/// Field of a partial update.
///
/// A field is changed iff the request carried it, so legitimate zero or
/// `false` values are applied rather than read as "absent". Use with
/// `#[serde(default)]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Unset,
    Value(T),
}

impl<T> Patch<T> {
    pub fn apply_to(self, target: &mut T) {
        if let Patch::Value(v) = self { *target = v; }
    }
    pub fn into_option(self) -> Option<T> {
        match self { Patch::Unset => None, Patch::Value(v) => Some(v) }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Patch::Value)
    }
}

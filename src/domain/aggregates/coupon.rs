//! Coupon Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{CouponCode, Money, Patch};
use crate::{EcommerceError, Result};

/// Time-windowed, threshold-gated percentage discount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub discount_percentage: Decimal,
    pub minimum_cart_value: Money,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoupon {
    pub code: String,
    pub discount_percentage: Decimal,
    #[serde(default)]
    pub minimum_cart_value: Money,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponChanges {
    #[serde(default)] pub discount_percentage: Patch<Decimal>,
    #[serde(default)] pub minimum_cart_value: Patch<Money>,
    #[serde(default)] pub start_date: Patch<DateTime<Utc>>,
    #[serde(default)] pub end_date: Patch<DateTime<Utc>>,
    #[serde(default)] pub is_active: Patch<bool>,
}

impl Coupon {
    pub fn create(new: NewCoupon) -> Result<Self> {
        let code = CouponCode::new(new.code)?;
        let now = Utc::now();
        let coupon = Self {
            id: Uuid::now_v7(),
            code: code.as_str().to_string(),
            discount_percentage: new.discount_percentage,
            minimum_cart_value: new.minimum_cart_value,
            start_date: new.start_date,
            end_date: new.end_date,
            is_active: true,
            usage_count: 0,
            created_at: now,
            updated_at: now,
        };
        coupon.validate()?;
        Ok(coupon)
    }

    /// Applies the present fields and re-validates. On error the coupon is left untouched.
    pub fn apply_changes(&mut self, changes: CouponChanges) -> Result<()> {
        let mut updated = self.clone();
        changes.discount_percentage.apply_to(&mut updated.discount_percentage);
        changes.minimum_cart_value.apply_to(&mut updated.minimum_cart_value);
        changes.start_date.apply_to(&mut updated.start_date);
        changes.end_date.apply_to(&mut updated.end_date);
        changes.is_active.apply_to(&mut updated.is_active);
        updated.validate()?;
        updated.updated_at = Utc::now();
        *self = updated;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.discount_percentage < Decimal::ZERO || self.discount_percentage > Decimal::ONE_HUNDRED {
            return Err(EcommerceError::InvalidInput("Discount percentage must be between 0 and 100".into()));
        }
        if self.minimum_cart_value.is_negative() {
            return Err(EcommerceError::InvalidInput("Minimum cart value cannot be negative".into()));
        }
        if self.start_date > self.end_date {
            return Err(EcommerceError::InvalidInput("End date must be after start date".into()));
        }
        Ok(())
    }

    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date
    }

    pub fn discount_for(&self, subtotal: Money) -> Money {
        subtotal.percentage(self.discount_percentage)
    }
}

#[cfg(test)]
pub(crate) fn sample(code: &str, percent: i64, minimum: i64) -> Coupon {
    let now = Utc::now();
    Coupon::create(NewCoupon {
        code: code.into(),
        discount_percentage: Decimal::from(percent),
        minimum_cart_value: Money::from_major(minimum),
        start_date: now - chrono::Duration::days(1),
        end_date: now + chrono::Duration::days(30),
    }).unwrap()
}

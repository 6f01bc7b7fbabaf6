use std::sync::Arc;

use uuid::Uuid;

use crate::domain::aggregates::{Coupon, CouponChanges, NewCoupon};
use crate::store::Store;
use crate::Result;

#[derive(Clone)]
pub struct CouponService {
    store: Arc<dyn Store>,
}

impl CouponService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    pub async fn list(&self) -> Result<Vec<Coupon>> {
        self.store.list_coupons().await
    }

    pub async fn create(&self, new: NewCoupon) -> Result<Coupon> {
        let coupon = Coupon::create(new)?;
        self.store.insert_coupon(&coupon).await?;
        tracing::info!(code = %coupon.code, "coupon created");
        Ok(coupon)
    }

    pub async fn update(&self, id: Uuid, changes: CouponChanges) -> Result<Coupon> {
        let mut coupon = self.store.get_coupon(id).await?;
        coupon.apply_changes(changes)?;
        self.store.save_coupon(&coupon).await?;
        tracing::info!(code = %coupon.code, "coupon updated");
        Ok(coupon)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.store.delete_coupon(id).await?;
        tracing::info!(coupon_id = %id, "coupon deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::value_objects::{Money, Patch};
    use crate::services::testing::services;
    use crate::EcommerceError;

    fn new_coupon(code: &str) -> NewCoupon {
        let now = Utc::now();
        NewCoupon {
            code: code.into(),
            discount_percentage: Decimal::from(15),
            minimum_cart_value: Money::from_major(100),
            start_date: now,
            end_date: now + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn codes_are_unique_case_insensitively() {
        let (_, services) = services();
        let created = services.coupons.create(new_coupon("welcome")).await.unwrap();
        assert_eq!(created.code, "WELCOME");
        assert!(matches!(services.coupons.create(new_coupon("Welcome")).await, Err(EcommerceError::DuplicateCoupon(_))));
        assert_eq!(services.coupons.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn zero_values_are_honoured_on_update() {
        let (_, services) = services();
        let created = services.coupons.create(new_coupon("WELCOME")).await.unwrap();
        let changes = CouponChanges {
            discount_percentage: Patch::Value(Decimal::ZERO),
            minimum_cart_value: Patch::Value(Money::zero()),
            ..Default::default()
        };
        let updated = services.coupons.update(created.id, changes).await.unwrap();
        assert_eq!(updated.discount_percentage, Decimal::ZERO);
        assert_eq!(updated.minimum_cart_value, Money::zero());
        assert!(updated.is_active);
    }

    #[tokio::test]
    async fn invalid_update_is_rejected_whole() {
        let (_, services) = services();
        let created = services.coupons.create(new_coupon("WELCOME")).await.unwrap();
        let changes = CouponChanges {
            discount_percentage: Patch::Value(Decimal::from(30)),
            end_date: Patch::Value(created.start_date - Duration::days(1)),
            ..Default::default()
        };
        assert!(matches!(services.coupons.update(created.id, changes).await, Err(EcommerceError::InvalidInput(_))));
        let stored = services.coupons.list().await.unwrap().remove(0);
        assert_eq!(stored.discount_percentage, Decimal::from(15));

        services.coupons.delete(created.id).await.unwrap();
        assert!(matches!(services.coupons.delete(created.id).await, Err(EcommerceError::CouponNotFound)));
    }
}

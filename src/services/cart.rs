//! Cart engine: every mutation ends in [`Cart::recalculate`] against the
//! attached coupon's current record, then a save.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::aggregates::{Cart, Coupon, Pricing};
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{CouponCode, Quantity};
use crate::publisher::EventPublisher;
use crate::store::Store;
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
    pricing: Pricing,
    publisher: EventPublisher,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>, pricing: Pricing, publisher: EventPublisher) -> Self {
        Self { store, pricing, publisher }
    }

    pub async fn get_cart(&self, owner_id: Uuid) -> Result<Cart> {
        self.store.cart_for_owner(owner_id).await
    }

    pub async fn add_item(&self, owner_id: Uuid, product_id: Uuid, quantity: i64) -> Result<Cart> {
        let quantity = Quantity::new(quantity)?;
        let product = self.store.get_product(product_id).await?;
        let mut cart = self.store.cart_for_owner(owner_id).await?;
        cart.add_item(&product, quantity)?;
        tracing::info!(%owner_id, %product_id, quantity = quantity.value(), "item added to cart");
        self.commit(cart).await
    }

    /// Sets the quantity of a line already in the cart; `0` removes it.
    pub async fn update_item(&self, owner_id: Uuid, product_id: Uuid, quantity: i64) -> Result<Cart> {
        if quantity < 0 {
            return Err(EcommerceError::InvalidQuantity(quantity));
        }
        let mut cart = self.store.cart_for_owner(owner_id).await?;
        if cart.item(product_id).is_none() {
            return Err(EcommerceError::CartItemNotFound(product_id));
        }
        if quantity == 0 {
            cart.remove_item(product_id)?;
        } else {
            let product = self.store.get_product(product_id).await?;
            cart.update_quantity(&product, quantity)?;
        }
        tracing::info!(%owner_id, %product_id, quantity, "cart item updated");
        self.commit(cart).await
    }

    pub async fn remove_item(&self, owner_id: Uuid, product_id: Uuid) -> Result<Cart> {
        let mut cart = self.store.cart_for_owner(owner_id).await?;
        cart.remove_item(product_id)?;
        tracing::info!(%owner_id, %product_id, "item removed from cart");
        self.commit(cart).await
    }

    pub async fn apply_coupon(&self, owner_id: Uuid, code: &str) -> Result<Cart> {
        let code = CouponCode::new(code)?;
        let mut cart = self.store.cart_for_owner(owner_id).await?;
        if cart.is_empty() {
            return Err(EcommerceError::EmptyCart);
        }
        if let Some(applied) = attached_coupon(self.store.as_ref(), &cart).await?.filter(|c| c.is_active) {
            if applied.code == code.as_str() {
                return Err(EcommerceError::CouponAlreadyApplied(applied.code));
            }
            return Err(EcommerceError::ConflictingCoupon { applied: applied.code });
        }
        let coupon = self
            .store
            .find_active_coupon(&code, chrono::Utc::now())
            .await?
            .ok_or(EcommerceError::InvalidOrExpiredCoupon)?;

        // stale reference to a deleted or deactivated coupon
        cart.detach_coupon();
        cart.recalculate(&self.pricing, None);
        cart.attach_coupon(&coupon)?;
        tracing::info!(%owner_id, code = %code, "coupon applied");
        self.commit(cart).await
    }

    /// Detaches the applied coupon. A cart without one is returned as is.
    pub async fn remove_coupon(&self, owner_id: Uuid) -> Result<Cart> {
        let mut cart = self.store.cart_for_owner(owner_id).await?;
        if cart.coupon_id().is_none() {
            return Ok(cart);
        }
        cart.detach_coupon();
        tracing::info!(%owner_id, "coupon removed");
        self.commit(cart).await
    }

    async fn commit(&self, mut cart: Cart) -> Result<Cart> {
        let coupon = attached_coupon(self.store.as_ref(), &cart).await?;
        cart.recalculate(&self.pricing, coupon.as_ref());
        self.store.save_cart(&cart).await?;

        let events = cart.take_events();
        warn_detached(cart.owner_id(), &events);
        self.publisher.publish_all(events).await;
        Ok(cart)
    }
}

/// Current record of the coupon attached to `cart`, if it still exists.
pub(super) async fn attached_coupon(store: &dyn Store, cart: &Cart) -> Result<Option<Coupon>> {
    let Some(id) = cart.coupon_id() else { return Ok(None) };
    match store.get_coupon(id).await {
        Ok(coupon) => Ok(Some(coupon)),
        Err(EcommerceError::CouponNotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

pub(super) fn warn_detached(owner_id: Uuid, events: &[DomainEvent]) {
    for event in events {
        if let DomainEvent::Cart(CartEvent::CouponDetached { coupon_id, .. }) = event {
            tracing::warn!(%owner_id, %coupon_id, "coupon no longer active, detached from cart");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{CartTotals, CouponChanges};
    use crate::domain::value_objects::{Money, Patch};
    use crate::services::testing::{coupon, customer, services, stocked};
    use crate::store::{CartRepository, CouponRepository};

    #[tokio::test]
    async fn totals_follow_every_mutation() {
        let (store, services) = services();
        let owner = customer(&services).await;
        let widget = stocked(&store, "Widget", 100, 10).await;

        let cart = services.cart.add_item(owner, widget.id, 2).await.unwrap();
        assert_eq!(cart.totals().subtotal, Money::from_major(200));
        assert_eq!(cart.totals().tax, Money::from_major(36));
        assert_eq!(cart.totals().total, Money::from_major(236));

        let stored = store.find_cart(owner).await.unwrap().unwrap();
        assert_eq!(stored.totals(), cart.totals());
    }

    #[tokio::test]
    async fn add_then_zero_update_restores_empty_totals() {
        let (store, services) = services();
        let owner = customer(&services).await;
        let widget = stocked(&store, "Widget", 100, 10).await;

        let before = services.cart.get_cart(owner).await.unwrap();
        services.cart.add_item(owner, widget.id, 2).await.unwrap();
        let after = services.cart.update_item(owner, widget.id, 0).await.unwrap();
        assert!(after.item(widget.id).is_none());
        assert_eq!(after.totals(), before.totals());
        assert_eq!(*after.totals(), CartTotals::default());
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_cart_unchanged() {
        let (store, services) = services();
        let owner = customer(&services).await;
        let widget = stocked(&store, "Widget", 100, 3).await;

        let err = services.cart.add_item(owner, widget.id, 4).await.unwrap_err();
        assert!(matches!(err, EcommerceError::InsufficientStock { available: 3, .. }));
        assert!(services.cart.get_cart(owner).await.unwrap().is_empty());

        let err = services.cart.add_item(owner, Uuid::now_v7(), 1).await.unwrap_err();
        assert!(matches!(err, EcommerceError::ProductNotFound(_)));
        let err = services.cart.add_item(owner, widget.id, 0).await.unwrap_err();
        assert!(matches!(err, EcommerceError::InvalidQuantity(0)));
    }

    #[tokio::test]
    async fn update_and_remove_require_existing_line() {
        let (store, services) = services();
        let owner = customer(&services).await;
        let widget = stocked(&store, "Widget", 100, 5).await;

        assert!(matches!(services.cart.update_item(owner, widget.id, 1).await, Err(EcommerceError::CartItemNotFound(_))));
        assert!(matches!(services.cart.remove_item(owner, widget.id).await, Err(EcommerceError::CartItemNotFound(_))));
        assert!(matches!(services.cart.update_item(owner, widget.id, -1).await, Err(EcommerceError::InvalidQuantity(-1))));

        services.cart.add_item(owner, widget.id, 1).await.unwrap();
        assert!(matches!(
            services.cart.update_item(owner, widget.id, 6).await,
            Err(EcommerceError::InsufficientStock { available: 5, .. })
        ));
        let cart = services.cart.update_item(owner, widget.id, 5).await.unwrap();
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[tokio::test]
    async fn coupon_discount_applies_once() {
        let (store, services) = services();
        let owner = customer(&services).await;
        let widget = stocked(&store, "Widget", 100, 10).await;
        coupon(&store, "SAVE10", 10, 150).await;
        coupon(&store, "OTHER5", 5, 0).await;

        assert!(matches!(services.cart.apply_coupon(owner, "save10").await, Err(EcommerceError::EmptyCart)));
        services.cart.add_item(owner, widget.id, 2).await.unwrap();

        let cart = services.cart.apply_coupon(owner, " save10 ").await.unwrap();
        assert_eq!(cart.totals().discount, Money::from_major(20));
        assert_eq!(cart.totals().total, Money::from_major(216));

        assert!(matches!(services.cart.apply_coupon(owner, "SAVE10").await, Err(EcommerceError::CouponAlreadyApplied(_))));
        match services.cart.apply_coupon(owner, "OTHER5").await {
            Err(EcommerceError::ConflictingCoupon { applied }) => assert_eq!(applied, "SAVE10"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn coupon_failures_leave_cart_unchanged() {
        let (store, services) = services();
        let owner = customer(&services).await;
        let widget = stocked(&store, "Widget", 100, 10).await;
        coupon(&store, "BIG", 10, 500).await;
        services.cart.add_item(owner, widget.id, 2).await.unwrap();

        let err = services.cart.apply_coupon(owner, "BIG").await.unwrap_err();
        assert!(matches!(err, EcommerceError::MinimumCartValueNotMet { .. }));
        assert!(matches!(services.cart.apply_coupon(owner, "NOPE").await, Err(EcommerceError::InvalidOrExpiredCoupon)));
        assert!(matches!(services.cart.apply_coupon(owner, "  ").await, Err(EcommerceError::InvalidInput(_))));

        let cart = services.cart.get_cart(owner).await.unwrap();
        assert_eq!(cart.coupon_id(), None);
        assert_eq!(cart.totals().total, Money::from_major(236));
    }

    #[tokio::test]
    async fn remove_coupon_is_idempotent() {
        let (store, services) = services();
        let owner = customer(&services).await;
        let widget = stocked(&store, "Widget", 100, 10).await;
        coupon(&store, "SAVE10", 10, 0).await;
        services.cart.add_item(owner, widget.id, 2).await.unwrap();
        services.cart.apply_coupon(owner, "SAVE10").await.unwrap();

        let once = services.cart.remove_coupon(owner).await.unwrap();
        assert_eq!(once.coupon_id(), None);
        assert_eq!(once.totals().total, Money::from_major(236));

        let twice = services.cart.remove_coupon(owner).await.unwrap();
        assert_eq!(twice.totals(), once.totals());
        assert_eq!(twice.updated_at(), once.updated_at());
    }

    #[tokio::test]
    async fn deactivated_coupon_is_detached_on_next_mutation() {
        let (store, services) = services();
        let owner = customer(&services).await;
        let widget = stocked(&store, "Widget", 100, 10).await;
        let mut save10 = coupon(&store, "SAVE10", 10, 0).await;
        services.cart.add_item(owner, widget.id, 1).await.unwrap();
        services.cart.apply_coupon(owner, "SAVE10").await.unwrap();

        save10.apply_changes(CouponChanges { is_active: Patch::Value(false), ..Default::default() }).unwrap();
        store.save_coupon(&save10).await.unwrap();

        let cart = services.cart.add_item(owner, widget.id, 1).await.unwrap();
        assert_eq!(cart.coupon_id(), None);
        assert_eq!(cart.totals().discount, Money::zero());
        assert_eq!(cart.totals().total, Money::from_major(236));
    }

    #[tokio::test]
    async fn emptying_the_cart_drops_the_coupon() {
        let (store, services) = services();
        let owner = customer(&services).await;
        let widget = stocked(&store, "Widget", 100, 10).await;
        coupon(&store, "SAVE10", 10, 0).await;
        services.cart.add_item(owner, widget.id, 1).await.unwrap();
        services.cart.apply_coupon(owner, "SAVE10").await.unwrap();

        let cart = services.cart.remove_item(owner, widget.id).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.coupon_id(), None);
        assert_eq!(*cart.totals(), CartTotals::default());
    }
}

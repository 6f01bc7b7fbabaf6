//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Coupon, Product};
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{Money, Quantity};
use crate::{EcommerceError, Result};

/// Tax rates and rounding shared by every cart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pricing {
    tax_percent: Decimal,
}

impl Pricing {
    pub const DEFAULT_TAX_PERCENT: i64 = 18;

    pub fn new(tax_percent: Decimal) -> Self { Self { tax_percent } }
    pub fn tax_percent(&self) -> Decimal { self.tax_percent }
    pub fn tax_on(&self, subtotal: Money) -> Money { subtotal.percentage(self.tax_percent) }
}

impl Default for Pricing {
    fn default() -> Self { Self::new(Decimal::from(Self::DEFAULT_TAX_PERCENT)) }
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Catalog price at the last add/update of this line.
    pub unit_price: Money,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    id: Uuid,
    owner_id: Uuid,
    items: Vec<CartItem>,
    coupon_id: Option<Uuid>,
    #[serde(flatten)]
    totals: CartTotals,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Cart {
    pub fn new(owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), owner_id, items: vec![], coupon_id: None,
            totals: CartTotals::default(), created_at: now, updated_at: now, events: vec![],
        }
    }

    /// Rebuilds a cart from storage without re-deriving anything.
    pub fn restore(
        id: Uuid,
        owner_id: Uuid,
        items: Vec<CartItem>,
        coupon_id: Option<Uuid>,
        totals: CartTotals,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self { id, owner_id, items, coupon_id, totals, created_at, updated_at, events: vec![] }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn owner_id(&self) -> Uuid { self.owner_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn coupon_id(&self) -> Option<Uuid> { self.coupon_id }
    pub fn totals(&self) -> &CartTotals { &self.totals }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn item(&self, product_id: Uuid) -> Option<&CartItem> { self.items.iter().find(|i| i.product_id == product_id) }

    /// Adds `quantity` of `product`, merging into an existing line and
    /// refreshing its price snapshot. Totals are stale until [`Cart::recalculate`].
    pub fn add_item(&mut self, product: &Product, quantity: Quantity) -> Result<()> {
        product.ensure_available()?;
        product.ensure_stock(quantity.value())?;
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let merged = Quantity::new(i64::from(existing.quantity))?.add(quantity)?;
            existing.quantity = merged.value();
            existing.unit_price = product.price;
        } else {
            self.items.push(CartItem { product_id: product.id, quantity: quantity.value(), unit_price: product.price });
        }
        self.touch();
        Ok(())
    }

    /// Overwrites the quantity of an existing line; `0` removes it.
    pub fn update_quantity(&mut self, product: &Product, quantity: i64) -> Result<()> {
        if quantity < 0 { return Err(EcommerceError::InvalidQuantity(quantity)); }
        let position = self.position(product.id)?;
        if quantity == 0 {
            self.items.remove(position);
        } else {
            let quantity = Quantity::new(quantity)?;
            product.ensure_stock(quantity.value())?;
            if let Some(item) = self.items.get_mut(position) {
                item.quantity = quantity.value();
                item.unit_price = product.price;
            }
        }
        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> Result<()> {
        let position = self.position(product_id)?;
        self.items.remove(position);
        self.touch();
        Ok(())
    }

    /// Attaches `coupon`. The caller has already resolved the code to a
    /// redeemable coupon and ruled out an existing attachment.
    pub fn attach_coupon(&mut self, coupon: &Coupon) -> Result<()> {
        if self.is_empty() { return Err(EcommerceError::EmptyCart); }
        if self.totals.subtotal < coupon.minimum_cart_value {
            return Err(EcommerceError::MinimumCartValueNotMet { minimum: coupon.minimum_cart_value });
        }
        self.coupon_id = Some(coupon.id);
        self.raise_event(DomainEvent::Cart(CartEvent::CouponApplied { cart_id: self.id, coupon_id: coupon.id, code: coupon.code.clone() }));
        self.touch();
        Ok(())
    }

    pub fn detach_coupon(&mut self) {
        if self.coupon_id.take().is_some() { self.touch(); }
    }

    /// Empties the cart in place after checkout.
    pub fn clear(&mut self) {
        self.items.clear();
        self.coupon_id = None;
        self.totals = CartTotals::default();
        self.touch();
    }

    /// Re-derives every monetary field from the current lines.
    ///
    /// `coupon` must be the current record of the attached coupon, if any.
    /// An empty cart, or a coupon that is missing or no longer active, loses
    /// its attachment.
    pub fn recalculate(&mut self, pricing: &Pricing, coupon: Option<&Coupon>) {
        if self.items.is_empty() {
            self.coupon_id = None;
        }
        let subtotal: Money = self.items.iter().map(CartItem::line_total).sum();
        let tax = pricing.tax_on(subtotal);
        let discount = match self.coupon_id {
            None => Money::zero(),
            Some(attached) => match coupon {
                Some(c) if c.id == attached && c.is_active => c.discount_for(subtotal),
                _ => {
                    self.coupon_id = None;
                    self.raise_event(DomainEvent::Cart(CartEvent::CouponDetached { cart_id: self.id, coupon_id: attached }));
                    Money::zero()
                }
            },
        };
        self.totals = CartTotals { subtotal, tax, discount, total: subtotal + tax - discount };
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }

    fn position(&self, product_id: Uuid) -> Result<usize> {
        self.items.iter().position(|i| i.product_id == product_id).ok_or(EcommerceError::CartItemNotFound(product_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{coupon, product};

    fn qty(n: i64) -> Quantity { Quantity::new(n).unwrap() }

    #[test]
    fn test_totals_with_tax() {
        let p = product::sample("Widget", 100, 10);
        let mut cart = Cart::new(Uuid::now_v7());
        cart.add_item(&p, qty(2)).unwrap();
        cart.recalculate(&Pricing::default(), None);
        assert_eq!(cart.totals().subtotal, Money::from_major(200));
        assert_eq!(cart.totals().tax, Money::from_major(36));
        assert_eq!(cart.totals().discount, Money::zero());
        assert_eq!(cart.totals().total, Money::from_major(236));
    }

    #[test]
    fn test_merge_refreshes_price_snapshot() {
        let mut p = product::sample("Widget", 100, 10);
        let mut cart = Cart::new(Uuid::now_v7());
        cart.add_item(&p, qty(1)).unwrap();
        p.price = Money::from_major(120);
        cart.add_item(&p, qty(2)).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.items()[0].unit_price, Money::from_major(120));
    }

    #[test]
    fn test_add_rejects_inactive_and_short_stock() {
        let mut p = product::sample("Widget", 100, 1);
        let mut cart = Cart::new(Uuid::now_v7());
        assert!(matches!(cart.add_item(&p, qty(2)), Err(EcommerceError::InsufficientStock { available: 1, .. })));
        p.is_active = false;
        assert!(matches!(cart.add_item(&p, qty(1)), Err(EcommerceError::ProductUnavailable(_))));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_to_zero_removes_line() {
        let p = product::sample("Widget", 100, 10);
        let mut cart = Cart::new(Uuid::now_v7());
        cart.add_item(&p, qty(2)).unwrap();
        cart.update_quantity(&p, 0).unwrap();
        assert!(cart.item(p.id).is_none());
        assert!(matches!(cart.update_quantity(&p, -1), Err(EcommerceError::InvalidQuantity(-1))));
        assert!(matches!(cart.update_quantity(&p, 1), Err(EcommerceError::CartItemNotFound(_))));
    }

    #[test]
    fn test_coupon_discount_and_minimum() {
        let p = product::sample("Widget", 100, 10);
        let mut cart = Cart::new(Uuid::now_v7());
        cart.add_item(&p, qty(2)).unwrap();
        cart.recalculate(&Pricing::default(), None);

        let too_big = coupon::sample("BIG", 10, 500);
        assert!(matches!(cart.attach_coupon(&too_big), Err(EcommerceError::MinimumCartValueNotMet { .. })));
        assert_eq!(cart.coupon_id(), None);

        let save10 = coupon::sample("SAVE10", 10, 150);
        cart.attach_coupon(&save10).unwrap();
        cart.recalculate(&Pricing::default(), Some(&save10));
        assert_eq!(cart.totals().discount, Money::from_major(20));
        assert_eq!(cart.totals().total, Money::from_major(216));
    }

    #[test]
    fn test_inactive_coupon_is_detached_on_recalculate() {
        let p = product::sample("Widget", 100, 10);
        let mut cart = Cart::new(Uuid::now_v7());
        cart.add_item(&p, qty(2)).unwrap();
        cart.recalculate(&Pricing::default(), None);
        let mut save10 = coupon::sample("SAVE10", 10, 150);
        cart.attach_coupon(&save10).unwrap();
        save10.is_active = false;
        cart.recalculate(&Pricing::default(), Some(&save10));
        assert_eq!(cart.coupon_id(), None);
        assert_eq!(cart.totals().discount, Money::zero());
        assert_eq!(cart.totals().total, Money::from_major(236));
        let events = cart.take_events();
        assert!(matches!(events.last(), Some(DomainEvent::Cart(CartEvent::CouponDetached { .. }))));
    }

    #[test]
    fn test_emptied_cart_drops_coupon() {
        let p = product::sample("Widget", 100, 10);
        let save10 = coupon::sample("SAVE10", 10, 0);
        let mut cart = Cart::new(Uuid::now_v7());
        cart.add_item(&p, qty(1)).unwrap();
        cart.recalculate(&Pricing::default(), None);
        cart.attach_coupon(&save10).unwrap();
        cart.remove_item(p.id).unwrap();
        cart.recalculate(&Pricing::default(), Some(&save10));
        assert_eq!(cart.coupon_id(), None);
        assert_eq!(*cart.totals(), CartTotals::default());
    }
}

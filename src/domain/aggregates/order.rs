//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::aggregates::Cart;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::Money;
use crate::{EcommerceError, Result};

/// Line of a placed order. Name and price are copies taken at checkout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    Packed,
    Shipping,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [Self::Placed, Self::Packed, Self::Shipping, Self::Delivered, Self::Cancelled];

    /// Strictly later along the fulfilment path. Nothing leaves a terminal state.
    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        matches!((self.rank(), next.rank()), (Some(from), Some(to)) if to > from)
    }

    pub fn ensure_cancellable(self) -> Result<()> {
        match self {
            Self::Delivered => Err(EcommerceError::AlreadyDelivered),
            Self::Cancelled => Err(EcommerceError::AlreadyCancelled),
            _ => Ok(()),
        }
    }

    /// Position along the fulfilment path; `Cancelled` sits outside it.
    fn rank(self) -> Option<u8> {
        match self {
            Self::Placed => Some(0),
            Self::Packed => Some(1),
            Self::Shipping => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Placed => "Placed",
            Self::Packed => "Packed",
            Self::Shipping => "Shipping",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: Uuid,
    owner_id: Uuid,
    items: Vec<OrderLine>,
    status: OrderStatus,
    coupon_id: Option<Uuid>,
    subtotal: Money,
    discount: Money,
    tax: Money,
    total: Money,
    shipping_address: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Order {
    /// Snapshots a priced cart into a new order. `lines` carry the catalog
    /// names resolved at checkout, in cart order.
    pub fn place(cart: &Cart, lines: Vec<OrderLine>, shipping_address: impl Into<String>) -> Result<Self> {
        if cart.is_empty() || lines.is_empty() { return Err(EcommerceError::EmptyCart); }
        let totals = cart.totals();
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::now_v7(),
            owner_id: cart.owner_id(),
            items: lines,
            status: OrderStatus::Placed,
            coupon_id: cart.coupon_id(),
            subtotal: totals.subtotal,
            discount: totals.discount,
            tax: totals.tax,
            total: totals.total,
            shipping_address: shipping_address.into(),
            created_at: now,
            updated_at: now,
            events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: order.id, owner_id: order.owner_id, total: order.total.amount() }));
        Ok(order)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        owner_id: Uuid,
        items: Vec<OrderLine>,
        status: OrderStatus,
        coupon_id: Option<Uuid>,
        subtotal: Money,
        discount: Money,
        tax: Money,
        total: Money,
        shipping_address: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self { id, owner_id, items, status, coupon_id, subtotal, discount, tax, total, shipping_address, created_at, updated_at, events: vec![] }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn owner_id(&self) -> Uuid { self.owner_id }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn items(&self) -> &[OrderLine] { &self.items }
    pub fn coupon_id(&self) -> Option<Uuid> { self.coupon_id }
    pub fn subtotal(&self) -> Money { self.subtotal }
    pub fn discount(&self) -> Money { self.discount }
    pub fn tax(&self) -> Money { self.tax }
    pub fn total(&self) -> Money { self.total }
    pub fn shipping_address(&self) -> &str { &self.shipping_address }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Moves the order forward along `Placed → Packed → Shipping → Delivered`.
    pub fn advance_to(&mut self, next: OrderStatus) -> Result<()> {
        if !self.status.can_advance_to(next) {
            return Err(EcommerceError::InvalidStatusTransition { from: self.status.to_string(), to: next.to_string() });
        }
        let from = self.status;
        self.status = next;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: next }));
        Ok(())
    }

    /// Cancels a not-yet-delivered order. Restocking is the caller's job.
    pub fn cancel(&mut self) -> Result<()> {
        self.status.ensure_cancellable()?;
        self.status = OrderStatus::Cancelled;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[cfg(test)]
pub(crate) fn sample(owner_id: Uuid) -> Order {
    use crate::domain::aggregates::{product, Pricing};
    use crate::domain::value_objects::Quantity;

    let p = product::sample("Widget", 10, 10);
    let mut cart = Cart::new(owner_id);
    cart.add_item(&p, Quantity::new(2).unwrap()).unwrap();
    cart.recalculate(&Pricing::default(), None);
    let lines = vec![OrderLine { product_id: p.id, name: p.name.clone(), quantity: 2, unit_price: p.price }];
    Order::place(&cart, lines, "12 Market Road").unwrap()
}

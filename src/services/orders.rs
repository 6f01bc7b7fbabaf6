//! Order engine: checkout, history, cancellation and fulfilment status.

use std::sync::Arc;

use uuid::Uuid;

use super::cart::{attached_coupon, warn_detached};
use crate::domain::aggregates::{Order, OrderLine, OrderStatus, Pricing};
use crate::publisher::EventPublisher;
use crate::store::{CheckoutPlan, Store};
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    pricing: Pricing,
    publisher: EventPublisher,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, pricing: Pricing, publisher: EventPublisher) -> Self {
        Self { store, pricing, publisher }
    }

    /// Turns the owner's cart into an order shipped to the owner's address.
    ///
    /// The cart is repriced against the attached coupon's current record
    /// first, so a coupon deactivated or deleted since it was applied gives
    /// no discount. Stock is checked against the live catalog here and again,
    /// atomically, when the plan is committed. Order creation, stock
    /// decrements, coupon usage and the emptied cart are committed together.
    pub async fn place_order(&self, owner_id: Uuid) -> Result<Order> {
        let mut cart = self.store.find_cart(owner_id).await?.ok_or(EcommerceError::CartNotFound)?;
        if cart.is_empty() {
            return Err(EcommerceError::EmptyCart);
        }
        let coupon = attached_coupon(self.store.as_ref(), &cart).await?;
        cart.recalculate(&self.pricing, coupon.as_ref());
        let owner = self.store.get_user(owner_id).await?;

        let mut lines = Vec::with_capacity(cart.items().len());
        for item in cart.items() {
            let product = self.store.get_product(item.product_id).await?;
            if product.stock < item.quantity {
                return Err(EcommerceError::InsufficientStock {
                    product_id: product.id,
                    product_name: Some(product.name),
                    available: product.stock,
                });
            }
            lines.push(OrderLine { product_id: product.id, name: product.name, quantity: item.quantity, unit_price: item.unit_price });
        }

        let order = Order::place(&cart, lines, owner.address)?;
        cart.clear();
        let mut plan = CheckoutPlan { order, cart };
        self.store.commit_checkout(&plan).await?;

        tracing::info!(%owner_id, order_id = %plan.order.id(), total = %plan.order.total(), "order placed");
        let mut events = plan.order.take_events();
        let cart_events = plan.cart.take_events();
        warn_detached(owner_id, &cart_events);
        events.extend(cart_events);
        self.publisher.publish_all(events).await;
        Ok(plan.order)
    }

    pub async fn order_history(&self, owner_id: Uuid) -> Result<Vec<Order>> {
        self.store.list_orders(owner_id).await
    }

    pub async fn order_details(&self, owner_id: Uuid, order_id: Uuid) -> Result<Order> {
        self.store.find_order(owner_id, order_id).await
    }

    pub async fn cancel_order(&self, owner_id: Uuid, order_id: Uuid) -> Result<Order> {
        let order = self.store.find_order(owner_id, order_id).await?;
        self.cancel(order).await
    }

    pub async fn all_orders(&self) -> Result<Vec<Order>> {
        self.store.list_all_orders().await
    }

    /// Admin status change. `Cancelled` restocks exactly like a customer cancellation.
    pub async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order> {
        let mut order = self.store.get_order(order_id).await?;
        if status == OrderStatus::Cancelled {
            return self.cancel(order).await;
        }
        let from = order.status();
        order.advance_to(status)?;
        self.store.save_order_status(&order).await?;
        tracing::info!(%order_id, %from, to = %status, "order status updated");
        self.publisher.publish_all(order.take_events()).await;
        Ok(order)
    }

    async fn cancel(&self, mut order: Order) -> Result<Order> {
        order.cancel()?;
        let missing = self.store.commit_cancellation(&order).await?;
        for product_id in missing {
            tracing::warn!(order_id = %order.id(), %product_id, "product no longer exists, stock not restored");
        }
        tracing::info!(order_id = %order.id(), owner_id = %order.owner_id(), "order cancelled");
        self.publisher.publish_all(order.take_events()).await;
        Ok(order)
    }
}

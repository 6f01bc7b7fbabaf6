//! In-process store. One lock guards all state, so every trait method
//! (checkout included) is atomic with respect to the others.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    CartRepository, CheckoutLedger, CheckoutPlan, CouponRepository, DashboardMetrics, DashboardRepository,
    OrderRepository, ProductFilter, ProductRepository, StatusCount, UserRepository,
};
use crate::domain::aggregates::{Cart, Coupon, Order, OrderStatus, Product, ProductChanges, Role, User};
use crate::domain::value_objects::{CouponCode, Money};
use crate::{EcommerceError, Result};

#[derive(Debug, Default)]
struct State {
    products: BTreeMap<Uuid, Product>,
    coupons: BTreeMap<Uuid, Coupon>,
    carts: HashMap<Uuid, Cart>,
    orders: BTreeMap<Uuid, Order>,
    users: BTreeMap<Uuid, User>,
}

impl State {
    fn adjust_stock(&mut self, id: Uuid, delta: i32) -> Result<i32> {
        let product = self.products.get_mut(&id).ok_or(EcommerceError::ProductNotFound(id))?;
        match product.stock.checked_add(delta) {
            Some(next) if next >= 0 => {
                product.stock = next;
                product.updated_at = Utc::now();
                Ok(next)
            }
            _ => Err(EcommerceError::InsufficientStock { product_id: id, product_name: Some(product.name.clone()), available: product.stock }),
        }
    }

    fn orders_newest_first(&self, keep: impl Fn(&Order) -> bool) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.values().filter(|o| keep(o)).cloned().collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(&a.id())));
        orders
    }
}

/// Drops pending events so reloaded aggregates never replay them.
fn stored<T: Clone>(value: &T, drain: impl FnOnce(&mut T)) -> T {
    let mut copy = value.clone();
    drain(&mut copy);
    copy
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn get_product(&self, id: Uuid) -> Result<Product> {
        self.state.lock().await.products.get(&id).cloned().ok_or(EcommerceError::ProductNotFound(id))
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let state = self.state.lock().await;
        Ok(state.products.values().rev().filter(|p| filter.matches(p)).cloned().collect())
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let mut categories: Vec<String> = state.products.values().filter(|p| p.is_active).map(|p| p.category.clone()).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        self.state.lock().await.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, id: Uuid, changes: &ProductChanges) -> Result<Product> {
        let mut state = self.state.lock().await;
        let product = state.products.get_mut(&id).ok_or(EcommerceError::ProductNotFound(id))?;
        changes.clone().apply(product);
        Ok(product.clone())
    }

    async fn delete_product(&self, id: Uuid) -> Result<()> {
        self.state.lock().await.products.remove(&id).map(|_| ()).ok_or(EcommerceError::ProductNotFound(id))
    }

    async fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<i32> {
        self.state.lock().await.adjust_stock(id, delta)
    }
}

#[async_trait]
impl CouponRepository for MemoryStore {
    async fn get_coupon(&self, id: Uuid) -> Result<Coupon> {
        self.state.lock().await.coupons.get(&id).cloned().ok_or(EcommerceError::CouponNotFound)
    }

    async fn find_active_coupon(&self, code: &CouponCode, now: DateTime<Utc>) -> Result<Option<Coupon>> {
        let state = self.state.lock().await;
        Ok(state.coupons.values().find(|c| c.code == code.as_str() && c.is_redeemable_at(now)).cloned())
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>> {
        Ok(self.state.lock().await.coupons.values().cloned().collect())
    }

    async fn insert_coupon(&self, coupon: &Coupon) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.coupons.values().any(|c| c.code == coupon.code) {
            return Err(EcommerceError::DuplicateCoupon(coupon.code.clone()));
        }
        state.coupons.insert(coupon.id, coupon.clone());
        Ok(())
    }

    async fn save_coupon(&self, coupon: &Coupon) -> Result<()> {
        let mut state = self.state.lock().await;
        let existing = state.coupons.get_mut(&coupon.id).ok_or(EcommerceError::CouponNotFound)?;
        let usage_count = existing.usage_count;
        *existing = Coupon { usage_count, ..coupon.clone() };
        Ok(())
    }

    async fn delete_coupon(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        state.coupons.remove(&id).ok_or(EcommerceError::CouponNotFound)?;
        // carts keep the dangling reference; the next recalculation detaches it
        Ok(())
    }

}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn find_cart(&self, owner_id: Uuid) -> Result<Option<Cart>> {
        Ok(self.state.lock().await.carts.get(&owner_id).cloned())
    }

    async fn cart_for_owner(&self, owner_id: Uuid) -> Result<Cart> {
        let mut state = self.state.lock().await;
        Ok(state.carts.entry(owner_id).or_insert_with(|| Cart::new(owner_id)).clone())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut state = self.state.lock().await;
        state.carts.insert(cart.owner_id(), stored(cart, |c| { c.take_events(); }));
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn find_order(&self, owner_id: Uuid, id: Uuid) -> Result<Order> {
        let state = self.state.lock().await;
        state.orders.get(&id).filter(|o| o.owner_id() == owner_id).cloned().ok_or(EcommerceError::OrderNotFound)
    }

    async fn get_order(&self, id: Uuid) -> Result<Order> {
        self.state.lock().await.orders.get(&id).cloned().ok_or(EcommerceError::OrderNotFound)
    }

    async fn list_orders(&self, owner_id: Uuid) -> Result<Vec<Order>> {
        Ok(self.state.lock().await.orders_newest_first(move |o| o.owner_id() == owner_id))
    }

    async fn list_all_orders(&self) -> Result<Vec<Order>> {
        Ok(self.state.lock().await.orders_newest_first(|_| true))
    }

    async fn save_order_status(&self, order: &Order) -> Result<()> {
        let mut state = self.state.lock().await;
        let current = state.orders.get(&order.id()).ok_or(EcommerceError::OrderNotFound)?.status();
        if !current.can_advance_to(order.status()) {
            return Err(EcommerceError::InvalidStatusTransition { from: current.to_string(), to: order.status().to_string() });
        }
        state.orders.insert(order.id(), stored(order, |o| { o.take_events(); }));
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_user(&self, id: Uuid) -> Result<User> {
        self.state.lock().await.users.get(&id).cloned().ok_or(EcommerceError::UserNotFound)
    }

    async fn find_user_by_mobile(&self, mobile_number: &str, role: Role) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.mobile_number == mobile_number && u.role == role).cloned())
    }

    async fn admin_exists(&self) -> Result<bool> {
        Ok(self.state.lock().await.users.values().any(User::is_admin))
    }

    async fn insert_user_with_cart(&self, user: &User, cart: &Cart) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.mobile_number == user.mobile_number && u.role == user.role) {
            return Err(EcommerceError::DuplicateAccount);
        }
        state.users.insert(user.id, user.clone());
        state.carts.insert(user.id, stored(cart, |c| { c.take_events(); }));
        Ok(())
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&user.id) { return Err(EcommerceError::UserNotFound); }
        state.users.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl CheckoutLedger for MemoryStore {
    async fn commit_checkout(&self, plan: &CheckoutPlan) -> Result<()> {
        let mut state = self.state.lock().await;
        for line in plan.order.items() {
            let product = state.products.get(&line.product_id).ok_or(EcommerceError::ProductNotFound(line.product_id))?;
            if product.stock < line.quantity {
                return Err(EcommerceError::InsufficientStock { product_id: product.id, product_name: Some(product.name.clone()), available: product.stock });
            }
        }
        for line in plan.order.items() {
            state.adjust_stock(line.product_id, -line.quantity)?;
        }
        if let Some(coupon) = plan.order.coupon_id().and_then(|id| state.coupons.get_mut(&id)) {
            coupon.usage_count += 1;
        }
        state.orders.insert(plan.order.id(), stored(&plan.order, |o| { o.take_events(); }));
        state.carts.insert(plan.cart.owner_id(), stored(&plan.cart, |c| { c.take_events(); }));
        Ok(())
    }

    async fn commit_cancellation(&self, order: &Order) -> Result<Vec<Uuid>> {
        let mut state = self.state.lock().await;
        state.orders.get(&order.id()).ok_or(EcommerceError::OrderNotFound)?.status().ensure_cancellable()?;
        let mut missing = Vec::new();
        for line in order.items() {
            match state.adjust_stock(line.product_id, line.quantity) {
                Ok(_) => {}
                Err(EcommerceError::ProductNotFound(id)) => missing.push(id),
                Err(e) => return Err(e),
            }
        }
        state.orders.insert(order.id(), stored(order, |o| { o.take_events(); }));
        Ok(missing)
    }
}

#[async_trait]
impl DashboardRepository for MemoryStore {
    async fn dashboard_metrics(&self, low_stock_below: i32) -> Result<DashboardMetrics> {
        let state = self.state.lock().await;
        let live = || state.orders.values().filter(|o| o.status() != OrderStatus::Cancelled);
        let orders_by_status = OrderStatus::ALL
            .iter()
            .map(|status| StatusCount { status: *status, count: state.orders.values().filter(|o| o.status() == *status).count() as i64 })
            .filter(|c| c.count > 0)
            .collect();
        Ok(DashboardMetrics {
            total_orders: state.orders.len() as i64,
            products_in_inventory: state.products.len() as i64,
            total_items_sold: live().flat_map(|o| o.items()).map(|l| i64::from(l.quantity)).sum(),
            orders_by_status,
            total_sales: live().map(Order::total).sum::<Money>(),
            low_stock_products: state.products.values().filter(|p| p.stock < low_stock_below).count() as i64,
            coupon_usage: state.orders.values().filter(|o| o.coupon_id().is_some()).count() as i64,
            total_customers: state.users.values().filter(|u| u.role == Role::Customer).count() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product;

    #[tokio::test]
    async fn adjust_stock_never_goes_negative() {
        let store = MemoryStore::new();
        let p = product::sample("Kettle", 100, 3);
        store.insert_product(&p).await.unwrap();

        assert_eq!(store.adjust_stock(p.id, -2).await.unwrap(), 1);
        let err = store.adjust_stock(p.id, -2).await.unwrap_err();
        assert!(matches!(err, EcommerceError::InsufficientStock { available: 1, .. }));
        assert_eq!(store.get_product(p.id).await.unwrap().stock, 1);
        assert_eq!(store.adjust_stock(p.id, 4).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn concurrent_decrements_do_not_lose_updates() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let p = product::sample("Kettle", 100, 50);
        store.insert_product(&p).await.unwrap();
        let id = p.id;

        let tasks: Vec<_> = (0..60)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.adjust_stock(id, -1).await.is_ok() })
            })
            .collect();
        let mut succeeded = 0;
        for t in tasks {
            if t.await.unwrap() { succeeded += 1; }
        }
        assert_eq!(succeeded, 50);
        assert_eq!(store.get_product(id).await.unwrap().stock, 0);
    }

    #[tokio::test]
    async fn cart_is_created_on_first_access() {
        let store = MemoryStore::new();
        let owner = Uuid::now_v7();
        assert!(store.find_cart(owner).await.unwrap().is_none());
        let cart = store.cart_for_owner(owner).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(store.cart_for_owner(owner).await.unwrap().id(), cart.id());
    }
}

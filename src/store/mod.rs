//! Persistence seam.
//!
//! Services only see these traits. [`PgStore`] backs them with PostgreSQL,
//! [`MemoryStore`] keeps everything in process.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Coupon, Order, OrderStatus, Product, ProductChanges, Role, User};
use crate::domain::value_objects::{CouponCode, Money};
use crate::Result;

#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    /// Only active products with stock left.
    pub only_available: bool,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if self.only_available && !(product.is_active && product.stock > 0) { return false; }
        if self.category.as_ref().is_some_and(|c| c != &product.category) { return false; }
        if self.min_price.is_some_and(|min| product.price < min) { return false; }
        if self.max_price.is_some_and(|max| product.price > max) { return false; }
        true
    }
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn get_product(&self, id: Uuid) -> Result<Product>;
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;
    /// Distinct categories of active products, sorted.
    async fn list_categories(&self) -> Result<Vec<String>>;
    async fn insert_product(&self, product: &Product) -> Result<()>;
    async fn update_product(&self, id: Uuid, changes: &ProductChanges) -> Result<Product>;
    async fn delete_product(&self, id: Uuid) -> Result<()>;
    /// Atomically adds `delta` to the stored stock and returns the new level.
    /// Fails with `InsufficientStock` instead of going below zero.
    async fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<i32>;
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn get_coupon(&self, id: Uuid) -> Result<Coupon>;
    /// Active coupon with this code whose window contains `now`.
    async fn find_active_coupon(&self, code: &CouponCode, now: DateTime<Utc>) -> Result<Option<Coupon>>;
    async fn list_coupons(&self) -> Result<Vec<Coupon>>;
    async fn insert_coupon(&self, coupon: &Coupon) -> Result<()>;
    /// Writes everything but the usage counter.
    async fn save_coupon(&self, coupon: &Coupon) -> Result<()>;
    async fn delete_coupon(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find_cart(&self, owner_id: Uuid) -> Result<Option<Cart>>;
    /// The owner's cart, created empty on first access.
    async fn cart_for_owner(&self, owner_id: Uuid) -> Result<Cart>;
    async fn save_cart(&self, cart: &Cart) -> Result<()>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Fails with `OrderNotFound` when the order is missing or belongs to someone else.
    async fn find_order(&self, owner_id: Uuid, id: Uuid) -> Result<Order>;
    async fn get_order(&self, id: Uuid) -> Result<Order>;
    /// Newest first.
    async fn list_orders(&self, owner_id: Uuid) -> Result<Vec<Order>>;
    /// Every order, newest first.
    async fn list_all_orders(&self) -> Result<Vec<Order>>;
    /// Moves the stored order to `order.status()`, provided that is a forward
    /// move from the status currently stored. A stale copy fails with
    /// `InvalidStatusTransition` and leaves the stored order untouched.
    async fn save_order_status(&self, order: &Order) -> Result<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<User>;
    async fn find_user_by_mobile(&self, mobile_number: &str, role: Role) -> Result<Option<User>>;
    async fn admin_exists(&self) -> Result<bool>;
    /// Inserts the user and its empty cart together.
    async fn insert_user_with_cart(&self, user: &User, cart: &Cart) -> Result<()>;
    async fn save_user(&self, user: &User) -> Result<()>;
}

/// Everything checkout changes, committed as one unit.
#[derive(Clone, Debug)]
pub struct CheckoutPlan {
    /// The new order; its lines drive the stock decrements and its coupon
    /// (if any) gets one more use.
    pub order: Order,
    /// The owner's cart, already emptied.
    pub cart: Cart,
}

#[async_trait]
pub trait CheckoutLedger: Send + Sync {
    /// Creates the order, decrements stock per line, bumps coupon usage and
    /// saves the emptied cart. Either all of it happens or none of it does.
    async fn commit_checkout(&self, plan: &CheckoutPlan) -> Result<()>;

    /// Persists a cancelled order and puts its quantities back in stock.
    /// The stored status is re-checked first: a stored order that is already
    /// delivered or cancelled fails with `AlreadyDelivered`/`AlreadyCancelled`
    /// and nothing is restocked. Returns the products that no longer exist
    /// and were not restocked.
    async fn commit_cancellation(&self, order: &Order) -> Result<Vec<Uuid>>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_orders: i64,
    pub products_in_inventory: i64,
    pub total_items_sold: i64,
    pub orders_by_status: Vec<StatusCount>,
    pub total_sales: Money,
    pub low_stock_products: i64,
    pub coupon_usage: i64,
    pub total_customers: i64,
}

#[async_trait]
pub trait DashboardRepository: Send + Sync {
    async fn dashboard_metrics(&self, low_stock_below: i32) -> Result<DashboardMetrics>;
}

pub trait Store:
    ProductRepository + CouponRepository + CartRepository + OrderRepository + UserRepository + CheckoutLedger + DashboardRepository
{
}

impl<T> Store for T where
    T: ProductRepository + CouponRepository + CartRepository + OrderRepository + UserRepository + CheckoutLedger + DashboardRepository
{
}

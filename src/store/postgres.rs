//! PostgreSQL store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::PgConnection;
use uuid::Uuid;

use super::{
    CartRepository, CheckoutLedger, CheckoutPlan, CouponRepository, DashboardMetrics, DashboardRepository,
    OrderRepository, ProductFilter, ProductRepository, StatusCount, UserRepository,
};
use crate::domain::aggregates::{
    Cart, CartItem, CartTotals, Coupon, Order, OrderLine, OrderStatus, Product, ProductChanges, Role, User,
};
use crate::domain::value_objects::{CouponCode, Money};
use crate::{EcommerceError, Result};

const PRODUCT_COLUMNS: &str = "id, name, description, price, stock, category, image, is_active, created_at, updated_at";
const COUPON_COLUMNS: &str = "id, code, discount_percentage, minimum_cart_value, start_date, end_date, is_active, usage_count, created_at, updated_at";
const USER_COLUMNS: &str = "id, name, address, mobile_number, date_of_birth, email, password_hash, role, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, owner_id, status, coupon_id, subtotal, discount, tax, total, shipping_address, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| EcommerceError::StorageError(e.to_string()))
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error().is_some_and(|d| d.is_unique_violation())
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    owner_id: Uuid,
    coupon_id: Option<Uuid>,
    subtotal: Money,
    tax: Money,
    discount: Money,
    total: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CartRow {
    fn into_cart(self, items: Vec<CartItem>) -> Cart {
        let totals = CartTotals { subtotal: self.subtotal, tax: self.tax, discount: self.discount, total: self.total };
        Cart::restore(self.id, self.owner_id, items, self.coupon_id, totals, self.created_at, self.updated_at)
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    owner_id: Uuid,
    status: OrderStatus,
    coupon_id: Option<Uuid>,
    subtotal: Money,
    discount: Money,
    tax: Money,
    total: Money,
    shipping_address: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderLine>) -> Order {
        Order::restore(
            self.id, self.owner_id, items, self.status, self.coupon_id, self.subtotal, self.discount,
            self.tax, self.total, self.shipping_address, self.created_at, self.updated_at,
        )
    }
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    order_id: Uuid,
    product_id: Uuid,
    name: String,
    quantity: i32,
    unit_price: Money,
}

#[derive(sqlx::FromRow)]
struct DashboardRow {
    total_orders: i64,
    products_in_inventory: i64,
    total_items_sold: i64,
    total_sales: Decimal,
    low_stock_products: i64,
    coupon_usage: i64,
    total_customers: i64,
}

// -----------------------------------------------------------------------------
// Connection-level helpers, shared by pool calls and transactions
// -----------------------------------------------------------------------------

async fn adjust_stock_in(conn: &mut PgConnection, id: Uuid, delta: i32) -> Result<i32> {
    let updated: Option<i32> = sqlx::query_scalar(
        "UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1 AND stock + $2 >= 0 RETURNING stock",
    )
    .bind(id)
    .bind(delta)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(stock) = updated {
        return Ok(stock);
    }
    let current: Option<(i32, String)> = sqlx::query_as("SELECT stock, name FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match current {
        None => Err(EcommerceError::ProductNotFound(id)),
        Some((available, name)) => Err(EcommerceError::InsufficientStock { product_id: id, product_name: Some(name), available }),
    }
}

async fn load_cart(conn: &mut PgConnection, owner_id: Uuid) -> Result<Option<Cart>> {
    let row = sqlx::query_as::<_, CartRow>(
        "SELECT id, owner_id, coupon_id, subtotal, tax, discount, total, created_at, updated_at FROM carts WHERE owner_id = $1",
    )
    .bind(owner_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(row) = row else { return Ok(None) };
    let items = sqlx::query_as::<_, CartItem>(
        "SELECT product_id, quantity, unit_price FROM cart_items WHERE cart_id = $1 ORDER BY position",
    )
    .bind(row.id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(Some(row.into_cart(items)))
}

async fn insert_cart(conn: &mut PgConnection, cart: &Cart) -> Result<()> {
    let totals = cart.totals();
    sqlx::query(
        "INSERT INTO carts (id, owner_id, coupon_id, subtotal, tax, discount, total, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) ON CONFLICT (owner_id) DO NOTHING",
    )
    .bind(cart.id())
    .bind(cart.owner_id())
    .bind(cart.coupon_id())
    .bind(totals.subtotal)
    .bind(totals.tax)
    .bind(totals.discount)
    .bind(totals.total)
    .bind(cart.created_at())
    .bind(cart.updated_at())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn write_cart(conn: &mut PgConnection, cart: &Cart) -> Result<()> {
    let totals = cart.totals();
    let updated = sqlx::query(
        "UPDATE carts SET coupon_id = $2, subtotal = $3, tax = $4, discount = $5, total = $6, updated_at = $7 WHERE id = $1",
    )
    .bind(cart.id())
    .bind(cart.coupon_id())
    .bind(totals.subtotal)
    .bind(totals.tax)
    .bind(totals.discount)
    .bind(totals.total)
    .bind(cart.updated_at())
    .execute(&mut *conn)
    .await?
    .rows_affected();
    if updated == 0 {
        return Err(EcommerceError::CartNotFound);
    }
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart.id()).execute(&mut *conn).await?;
    for (position, item) in cart.items().iter().enumerate() {
        sqlx::query("INSERT INTO cart_items (cart_id, position, product_id, quantity, unit_price) VALUES ($1, $2, $3, $4, $5)")
            .bind(cart.id())
            .bind(position as i32)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_order(conn: &mut PgConnection, order: &Order) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
    ))
    .bind(order.id())
    .bind(order.owner_id())
    .bind(order.status())
    .bind(order.coupon_id())
    .bind(order.subtotal())
    .bind(order.discount())
    .bind(order.tax())
    .bind(order.total())
    .bind(order.shipping_address())
    .bind(order.created_at())
    .bind(order.updated_at())
    .execute(&mut *conn)
    .await?;
    for (position, line) in order.items().iter().enumerate() {
        sqlx::query(
            "INSERT INTO order_items (order_id, position, product_id, name, quantity, unit_price) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order.id())
        .bind(position as i32)
        .bind(line.product_id)
        .bind(&line.name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn stored_status(conn: &mut PgConnection, id: Uuid) -> Result<OrderStatus> {
    sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(EcommerceError::OrderNotFound)
}

/// `order_status` is declared in fulfilment order, so `status < $2` only
/// admits forward moves and never matches a terminal row.
async fn advance_order_status(conn: &mut PgConnection, order: &Order) -> Result<()> {
    let updated = sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1 AND status < $2")
        .bind(order.id())
        .bind(order.status())
        .bind(order.updated_at())
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if updated == 0 {
        let current = stored_status(conn, order.id()).await?;
        return Err(EcommerceError::InvalidStatusTransition { from: current.to_string(), to: order.status().to_string() });
    }
    Ok(())
}

async fn mark_cancelled(conn: &mut PgConnection, order: &Order) -> Result<()> {
    let updated = sqlx::query(
        "UPDATE orders SET status = 'cancelled', updated_at = $2 WHERE id = $1 AND status NOT IN ('delivered', 'cancelled')",
    )
    .bind(order.id())
    .bind(order.updated_at())
    .execute(&mut *conn)
    .await?
    .rows_affected();
    if updated == 0 {
        stored_status(conn, order.id()).await?.ensure_cancellable()?;
        return Err(EcommerceError::Internal(format!("order {} could not be cancelled", order.id())));
    }
    Ok(())
}

async fn attach_lines(conn: &mut PgConnection, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let lines = sqlx::query_as::<_, OrderLineRow>(
        "SELECT order_id, product_id, name, quantity, unit_price FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;
    let mut by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for l in lines {
        by_order.entry(l.order_id).or_default().push(OrderLine {
            product_id: l.product_id,
            name: l.name,
            quantity: l.quantity,
            unit_price: l.unit_price,
        });
    }
    Ok(rows
        .into_iter()
        .map(|row| {
            let items = by_order.remove(&row.id).unwrap_or_default();
            row.into_order(items)
        })
        .collect())
}

// -----------------------------------------------------------------------------
// Repositories
// -----------------------------------------------------------------------------

#[async_trait]
impl ProductRepository for PgStore {
    async fn get_product(&self, id: Uuid) -> Result<Product> {
        sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(EcommerceError::ProductNotFound(id))
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::TEXT IS NULL OR category = $1) \
               AND ($2::NUMERIC IS NULL OR price >= $2) \
               AND ($3::NUMERIC IS NULL OR price <= $3) \
               AND (NOT $4 OR (is_active AND stock > 0)) \
             ORDER BY created_at DESC"
        ))
        .bind(filter.category.clone())
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.only_available)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let categories = sqlx::query_scalar("SELECT DISTINCT category FROM products WHERE is_active ORDER BY category")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(&format!("INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"))
            .bind(product.id)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.stock)
            .bind(&product.category)
            .bind(&product.image)
            .bind(product.is_active)
            .bind(product.created_at)
            .bind(product.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_product(&self, id: Uuid, changes: &ProductChanges) -> Result<Product> {
        let changes = changes.clone();
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                price = COALESCE($4, price), \
                stock = COALESCE($5, stock), \
                category = COALESCE($6, category), \
                image = COALESCE($7, image), \
                is_active = COALESCE($8, is_active), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name.into_option())
        .bind(changes.description.into_option())
        .bind(changes.price.into_option())
        .bind(changes.stock.into_option())
        .bind(changes.category.into_option())
        .bind(changes.image.into_option())
        .bind(changes.is_active.into_option())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(EcommerceError::ProductNotFound(id))
    }

    async fn delete_product(&self, id: Uuid) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?.rows_affected();
        if deleted == 0 {
            return Err(EcommerceError::ProductNotFound(id));
        }
        Ok(())
    }

    async fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<i32> {
        let mut conn = self.pool.acquire().await?;
        adjust_stock_in(&mut conn, id, delta).await
    }
}

#[async_trait]
impl CouponRepository for PgStore {
    async fn get_coupon(&self, id: Uuid) -> Result<Coupon> {
        sqlx::query_as::<_, Coupon>(&format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(EcommerceError::CouponNotFound)
    }

    async fn find_active_coupon(&self, code: &CouponCode, now: DateTime<Utc>) -> Result<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1 AND is_active AND start_date <= $2 AND end_date >= $2"
        ))
        .bind(code.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(coupon)
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>> {
        let coupons = sqlx::query_as::<_, Coupon>(&format!("SELECT {COUPON_COLUMNS} FROM coupons ORDER BY created_at"))
            .fetch_all(&self.pool)
            .await?;
        Ok(coupons)
    }

    async fn insert_coupon(&self, coupon: &Coupon) -> Result<()> {
        sqlx::query(&format!("INSERT INTO coupons ({COUPON_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"))
            .bind(coupon.id)
            .bind(&coupon.code)
            .bind(coupon.discount_percentage)
            .bind(coupon.minimum_cart_value)
            .bind(coupon.start_date)
            .bind(coupon.end_date)
            .bind(coupon.is_active)
            .bind(coupon.usage_count)
            .bind(coupon.created_at)
            .bind(coupon.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| if is_unique_violation(&e) { EcommerceError::DuplicateCoupon(coupon.code.clone()) } else { e.into() })?;
        Ok(())
    }

    async fn save_coupon(&self, coupon: &Coupon) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE coupons SET discount_percentage = $2, minimum_cart_value = $3, start_date = $4, end_date = $5, \
             is_active = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(coupon.id)
        .bind(coupon.discount_percentage)
        .bind(coupon.minimum_cart_value)
        .bind(coupon.start_date)
        .bind(coupon.end_date)
        .bind(coupon.is_active)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(EcommerceError::CouponNotFound);
        }
        Ok(())
    }

    async fn delete_coupon(&self, id: Uuid) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM coupons WHERE id = $1").bind(id).execute(&self.pool).await?.rows_affected();
        if deleted == 0 {
            return Err(EcommerceError::CouponNotFound);
        }
        Ok(())
    }

}

#[async_trait]
impl CartRepository for PgStore {
    async fn find_cart(&self, owner_id: Uuid) -> Result<Option<Cart>> {
        let mut conn = self.pool.acquire().await?;
        load_cart(&mut conn, owner_id).await
    }

    async fn cart_for_owner(&self, owner_id: Uuid) -> Result<Cart> {
        let mut conn = self.pool.acquire().await?;
        insert_cart(&mut conn, &Cart::new(owner_id)).await?;
        load_cart(&mut conn, owner_id).await?.ok_or(EcommerceError::CartNotFound)
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_cart(&mut tx, cart).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn find_order(&self, owner_id: Uuid, id: Uuid) -> Result<Order> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND owner_id = $2"))
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(EcommerceError::OrderNotFound)?;
        attach_lines(&mut conn, vec![row]).await?.pop().ok_or(EcommerceError::OrderNotFound)
    }

    async fn get_order(&self, id: Uuid) -> Result<Order> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(EcommerceError::OrderNotFound)?;
        attach_lines(&mut conn, vec![row]).await?.pop().ok_or(EcommerceError::OrderNotFound)
    }

    async fn list_orders(&self, owner_id: Uuid) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE owner_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(&mut *conn)
        .await?;
        attach_lines(&mut conn, rows).await
    }

    async fn list_all_orders(&self) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"))
            .fetch_all(&mut *conn)
            .await?;
        attach_lines(&mut conn, rows).await
    }

    async fn save_order_status(&self, order: &Order) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        advance_order_status(&mut conn, order).await
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn get_user(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(EcommerceError::UserNotFound)
    }

    async fn find_user_by_mobile(&self, mobile_number: &str, role: Role) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE mobile_number = $1 AND role = $2"))
            .bind(mobile_number)
            .bind(role)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn admin_exists(&self) -> Result<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin')")
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn insert_user_with_cart(&self, user: &User, cart: &Cart) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"))
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.address)
            .bind(&user.mobile_number)
            .bind(user.date_of_birth)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| if is_unique_violation(&e) { EcommerceError::DuplicateAccount } else { e.into() })?;
        insert_cart(&mut tx, cart).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE users SET name = $2, address = $3, date_of_birth = $4, email = $5, updated_at = $6 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.address)
        .bind(user.date_of_birth)
        .bind(&user.email)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(EcommerceError::UserNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CheckoutLedger for PgStore {
    async fn commit_checkout(&self, plan: &CheckoutPlan) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for line in plan.order.items() {
            adjust_stock_in(&mut tx, line.product_id, -line.quantity).await?;
        }
        insert_order(&mut tx, &plan.order).await?;
        if let Some(coupon_id) = plan.order.coupon_id() {
            sqlx::query("UPDATE coupons SET usage_count = usage_count + 1 WHERE id = $1")
                .bind(coupon_id)
                .execute(&mut *tx)
                .await?;
        }
        write_cart(&mut tx, &plan.cart).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn commit_cancellation(&self, order: &Order) -> Result<Vec<Uuid>> {
        let mut tx = self.pool.begin().await?;
        mark_cancelled(&mut tx, order).await?;
        let mut missing = Vec::new();
        for line in order.items() {
            match adjust_stock_in(&mut tx, line.product_id, line.quantity).await {
                Ok(_) => {}
                Err(EcommerceError::ProductNotFound(id)) => missing.push(id),
                Err(e) => return Err(e),
            }
        }
        tx.commit().await?;
        Ok(missing)
    }
}

#[async_trait]
impl DashboardRepository for PgStore {
    async fn dashboard_metrics(&self, low_stock_below: i32) -> Result<DashboardMetrics> {
        let row = sqlx::query_as::<_, DashboardRow>(
            "SELECT \
                (SELECT COUNT(*) FROM orders) AS total_orders, \
                (SELECT COUNT(*) FROM products) AS products_in_inventory, \
                (SELECT COALESCE(SUM(oi.quantity), 0)::BIGINT FROM order_items oi \
                    JOIN orders o ON o.id = oi.order_id WHERE o.status <> 'cancelled') AS total_items_sold, \
                (SELECT COALESCE(SUM(total), 0)::NUMERIC FROM orders WHERE status <> 'cancelled') AS total_sales, \
                (SELECT COUNT(*) FROM products WHERE stock < $1) AS low_stock_products, \
                (SELECT COUNT(*) FROM orders WHERE coupon_id IS NOT NULL) AS coupon_usage, \
                (SELECT COUNT(*) FROM users WHERE role = 'customer') AS total_customers",
        )
        .bind(low_stock_below)
        .fetch_one(&self.pool)
        .await?;
        let orders_by_status = sqlx::query_as::<_, (OrderStatus, i64)>(
            "SELECT status, COUNT(*) FROM orders GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();
        Ok(DashboardMetrics {
            total_orders: row.total_orders,
            products_in_inventory: row.products_in_inventory,
            total_items_sold: row.total_items_sold,
            orders_by_status,
            total_sales: Money::new(row.total_sales),
            low_stock_products: row.low_stock_products,
            coupon_usage: row.coupon_usage,
            total_customers: row.total_customers,
        })
    }
}

//! `/api/customer` routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::error::ApiResult;
use super::identity::Customer;
use super::{ApiJson, ApiPath, ApiQuery};
use crate::domain::aggregates::{ProfileChanges, Role};
use crate::domain::value_objects::Money;
use crate::services::{Registration, Services};
use crate::store::ProductFilter;

pub fn routes() -> Router<Services> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/categories", get(list_categories))
        .route("/cart", get(get_cart).post(add_item).put(update_item))
        .route("/cart/coupon", post(apply_coupon).delete(remove_coupon))
        .route("/cart/:product_id", delete(remove_item))
        .route("/orders", post(place_order).get(order_history))
        .route("/orders/:id", get(order_details))
        .route("/orders/:id/cancel", put(cancel_order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub mobile_number: String,
    pub password: String,
}

async fn register(State(s): State<Services>, ApiJson(r): ApiJson<Registration>) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = s.accounts.register(r).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "message": "User registered successfully", "user": user }))))
}

async fn login(State(s): State<Services>, ApiJson(r): ApiJson<LoginRequest>) -> ApiResult<Json<Value>> {
    let user = s.accounts.authenticate(&r.mobile_number, &r.password, Role::Customer).await?;
    Ok(Json(json!({ "success": true, "message": "Login successful", "user": user })))
}

async fn get_profile(State(s): State<Services>, Customer(id): Customer) -> ApiResult<Json<Value>> {
    let user = s.accounts.profile(id).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

async fn update_profile(
    State(s): State<Services>,
    Customer(id): Customer,
    ApiJson(changes): ApiJson<ProfileChanges>,
) -> ApiResult<Json<Value>> {
    let user = s.accounts.update_profile(id, changes).await?;
    Ok(Json(json!({ "success": true, "message": "Profile updated successfully", "user": user })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
}

async fn list_products(State(s): State<Services>, ApiQuery(q): ApiQuery<ProductQuery>) -> ApiResult<Json<Value>> {
    let filter = ProductFilter {
        category: q.category.filter(|c| !c.trim().is_empty()),
        min_price: q.min_price,
        max_price: q.max_price,
        only_available: true,
    };
    let products = s.catalog.browse(filter).await?;
    Ok(Json(json!({ "success": true, "count": products.len(), "products": products })))
}

async fn get_product(State(s): State<Services>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Value>> {
    let product = s.catalog.product(id).await?;
    Ok(Json(json!({ "success": true, "product": product })))
}

async fn list_categories(State(s): State<Services>) -> ApiResult<Json<Value>> {
    let categories = s.catalog.categories().await?;
    Ok(Json(json!({ "success": true, "categories": categories })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CouponRequest {
    #[serde(default)]
    pub code: String,
}

async fn get_cart(State(s): State<Services>, Customer(id): Customer) -> ApiResult<Json<Value>> {
    let cart = s.cart.get_cart(id).await?;
    Ok(Json(json!({ "success": true, "cart": cart })))
}

async fn add_item(State(s): State<Services>, Customer(id): Customer, ApiJson(r): ApiJson<CartItemRequest>) -> ApiResult<Json<Value>> {
    let cart = s.cart.add_item(id, r.product_id, r.quantity).await?;
    Ok(Json(json!({ "success": true, "message": "Item added to cart", "cart": cart })))
}

async fn update_item(State(s): State<Services>, Customer(id): Customer, ApiJson(r): ApiJson<CartItemRequest>) -> ApiResult<Json<Value>> {
    let cart = s.cart.update_item(id, r.product_id, r.quantity).await?;
    Ok(Json(json!({ "success": true, "message": "Cart updated successfully", "cart": cart })))
}

async fn remove_item(State(s): State<Services>, Customer(id): Customer, ApiPath(product_id): ApiPath<Uuid>) -> ApiResult<Json<Value>> {
    let cart = s.cart.remove_item(id, product_id).await?;
    Ok(Json(json!({ "success": true, "message": "Item removed from cart", "cart": cart })))
}

async fn apply_coupon(State(s): State<Services>, Customer(id): Customer, ApiJson(r): ApiJson<CouponRequest>) -> ApiResult<Json<Value>> {
    let cart = s.cart.apply_coupon(id, &r.code).await?;
    Ok(Json(json!({ "success": true, "message": "Coupon applied successfully", "cart": cart })))
}

async fn remove_coupon(State(s): State<Services>, Customer(id): Customer) -> ApiResult<Json<Value>> {
    let cart = s.cart.remove_coupon(id).await?;
    Ok(Json(json!({ "success": true, "message": "Coupon removed successfully", "cart": cart })))
}

async fn place_order(State(s): State<Services>, Customer(id): Customer) -> ApiResult<(StatusCode, Json<Value>)> {
    let order = s.orders.place_order(id).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "message": "Order placed successfully", "order": order }))))
}

async fn order_history(State(s): State<Services>, Customer(id): Customer) -> ApiResult<Json<Value>> {
    let orders = s.orders.order_history(id).await?;
    Ok(Json(json!({ "success": true, "count": orders.len(), "orders": orders })))
}

async fn order_details(State(s): State<Services>, Customer(id): Customer, ApiPath(order_id): ApiPath<Uuid>) -> ApiResult<Json<Value>> {
    let order = s.orders.order_details(id, order_id).await?;
    Ok(Json(json!({ "success": true, "order": order })))
}

async fn cancel_order(State(s): State<Services>, Customer(id): Customer, ApiPath(order_id): ApiPath<Uuid>) -> ApiResult<Json<Value>> {
    let order = s.orders.cancel_order(id, order_id).await?;
    Ok(Json(json!({ "success": true, "message": "Order cancelled successfully", "order": order })))
}

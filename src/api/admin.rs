//! `/api/admin` routes. Everything but login requires the admin role.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::customer::LoginRequest;
use super::error::ApiResult;
use super::identity::Admin;
use super::{ApiJson, ApiPath};
use crate::domain::aggregates::{CouponChanges, NewCoupon, NewProduct, OrderStatus, ProductChanges, Role};
use crate::services::Services;

pub fn routes() -> Router<Services> {
    Router::new()
        .route("/login", post(login))
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", put(update_product).delete(delete_product))
        .route("/orders", get(list_orders))
        .route("/orders/:id/status", put(update_order_status))
        .route("/coupons", get(list_coupons).post(create_coupon))
        .route("/coupons/:id", put(update_coupon).delete(delete_coupon))
        .route("/dashboard", get(dashboard))
}

async fn login(State(s): State<Services>, ApiJson(r): ApiJson<LoginRequest>) -> ApiResult<Json<Value>> {
    let user = s.accounts.authenticate(&r.mobile_number, &r.password, Role::Admin).await?;
    Ok(Json(json!({ "success": true, "message": "Login successful", "user": user })))
}

async fn list_products(State(s): State<Services>, _: Admin) -> ApiResult<Json<Value>> {
    let products = s.catalog.all_products().await?;
    Ok(Json(json!({ "success": true, "count": products.len(), "products": products })))
}

async fn create_product(State(s): State<Services>, _: Admin, ApiJson(r): ApiJson<NewProduct>) -> ApiResult<(StatusCode, Json<Value>)> {
    let product = s.catalog.create_product(r).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "message": "Product added successfully", "product": product }))))
}

async fn update_product(
    State(s): State<Services>,
    _: Admin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<ProductChanges>,
) -> ApiResult<Json<Value>> {
    let product = s.catalog.update_product(id, changes).await?;
    Ok(Json(json!({ "success": true, "message": "Product updated successfully", "product": product })))
}

async fn delete_product(State(s): State<Services>, _: Admin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Value>> {
    s.catalog.delete_product(id).await?;
    Ok(Json(json!({ "success": true, "message": "Product deleted successfully" })))
}

async fn list_orders(State(s): State<Services>, _: Admin) -> ApiResult<Json<Value>> {
    let orders = s.orders.all_orders().await?;
    Ok(Json(json!({ "success": true, "count": orders.len(), "orders": orders })))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

async fn update_order_status(
    State(s): State<Services>,
    _: Admin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<StatusRequest>,
) -> ApiResult<Json<Value>> {
    let order = s.orders.update_status(id, r.status).await?;
    Ok(Json(json!({ "success": true, "message": "Order status updated successfully", "order": order })))
}

async fn list_coupons(State(s): State<Services>, _: Admin) -> ApiResult<Json<Value>> {
    let coupons = s.coupons.list().await?;
    Ok(Json(json!({ "success": true, "count": coupons.len(), "coupons": coupons })))
}

async fn create_coupon(State(s): State<Services>, _: Admin, ApiJson(r): ApiJson<NewCoupon>) -> ApiResult<(StatusCode, Json<Value>)> {
    let coupon = s.coupons.create(r).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "message": "Coupon created successfully", "coupon": coupon }))))
}

async fn update_coupon(
    State(s): State<Services>,
    _: Admin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<CouponChanges>,
) -> ApiResult<Json<Value>> {
    let coupon = s.coupons.update(id, changes).await?;
    Ok(Json(json!({ "success": true, "message": "Coupon updated successfully", "coupon": coupon })))
}

async fn delete_coupon(State(s): State<Services>, _: Admin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Value>> {
    s.coupons.delete(id).await?;
    Ok(Json(json!({ "success": true, "message": "Coupon deleted successfully" })))
}

async fn dashboard(State(s): State<Services>, _: Admin) -> ApiResult<Json<Value>> {
    let metrics = s.dashboard.metrics().await?;
    Ok(Json(json!({ "success": true, "metrics": metrics })))
}

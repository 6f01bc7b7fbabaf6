//! HTTP surface.

mod admin;
mod customer;
mod error;
mod identity;

pub use error::{status_for, ApiError, ApiResult};
pub use identity::{Admin, Customer, Identity, USER_ID_HEADER, USER_ROLE_HEADER};

use axum::extract::{FromRequest, FromRequestParts};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::services::Services;

/// JSON body whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

pub fn router(services: Services) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/customer", customer::routes())
        .nest("/api/admin", admin::routes())
        .with_state(services)
}

async fn health() -> Json<Value> {
    Json(json!({ "success": true, "status": "healthy", "service": "storefront" }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::domain::aggregates::{coupon, product};
    use crate::services::testing;
    use crate::store::{CouponRepository, MemoryStore, ProductRepository};

    struct TestApp {
        store: Arc<MemoryStore>,
        router: Router,
    }

    impl TestApp {
        fn new() -> Self {
            let (store, services) = testing::services();
            Self { store, router: router(services) }
        }

        async fn call(&self, method: Method, uri: &str, identity: Option<(Uuid, &str)>, body: Option<Value>) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some((user_id, role)) = identity {
                request = request.header(USER_ID_HEADER, user_id.to_string()).header(USER_ROLE_HEADER, role);
            }
            let request = match body {
                Some(body) => request.header(header::CONTENT_TYPE, "application/json").body(Body::from(body.to_string())),
                None => request.body(Body::empty()),
            }
            .unwrap();
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
            (status, value)
        }

        async fn register(&self) -> Uuid {
            let body = json!({
                "name": "Asha",
                "address": "12 Lake Road",
                "mobileNumber": "9876543210",
                "dateOfBirth": "1994-05-17",
                "email": "asha@example.com",
                "password": "Secret#123"
            });
            let (status, value) = self.call(Method::POST, "/api/customer/register", None, Some(body)).await;
            assert_eq!(status, StatusCode::CREATED);
            assert!(value["user"].get("passwordHash").is_none());
            value["user"]["id"].as_str().unwrap().parse().unwrap()
        }
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = TestApp::new();
        let (status, value) = app.call(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["status"], "healthy");
    }

    #[tokio::test]
    async fn checkout_flow_over_http() {
        let app = TestApp::new();
        let owner = app.register().await;
        let me = Some((owner, "customer"));
        let widget = product::sample("Widget", 100, 5);
        app.store.insert_product(&widget).await.unwrap();
        app.store.insert_coupon(&coupon::sample("SAVE10", 10, 150)).await.unwrap();

        let (status, value) =
            app.call(Method::POST, "/api/customer/cart", me, Some(json!({ "productId": widget.id, "quantity": 2 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["cart"]["total"], "236.00");

        let (status, value) = app.call(Method::POST, "/api/customer/cart/coupon", me, Some(json!({ "code": "save10" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["cart"]["discount"], "20.00");
        assert_eq!(value["cart"]["total"], "216.00");

        let (status, value) = app.call(Method::POST, "/api/customer/orders", me, None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(value["order"]["status"], "Placed");
        assert_eq!(value["order"]["items"][0]["name"], "Widget");

        let (_, value) = app.call(Method::GET, "/api/customer/cart", me, None).await;
        assert_eq!(value["cart"]["items"].as_array().map(Vec::len), Some(0));
        assert_eq!(value["cart"]["couponId"], Value::Null);
        assert_eq!(app.store.get_product(widget.id).await.unwrap().stock, 3);

        let (_, value) = app.call(Method::GET, "/api/customer/orders", me, None).await;
        assert_eq!(value["count"], 1);
    }

    #[tokio::test]
    async fn identity_headers_gate_routes() {
        let app = TestApp::new();
        let (status, value) = app.call(Method::GET, "/api/customer/cart", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(value["success"], false);

        let customer = Some((Uuid::now_v7(), "customer"));
        let (status, _) = app.call(Method::GET, "/api/admin/dashboard", customer, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin = Some((Uuid::now_v7(), "admin"));
        let (status, value) = app.call(Method::GET, "/api/admin/dashboard", admin, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["metrics"]["totalOrders"], 0);

        let (status, _) = app.call(Method::GET, "/api/customer/products", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn domain_errors_map_to_statuses() {
        let app = TestApp::new();
        let owner = app.register().await;
        let me = Some((owner, "customer"));
        let widget = product::sample("Widget", 100, 2);
        app.store.insert_product(&widget).await.unwrap();

        let (status, value) =
            app.call(Method::POST, "/api/customer/cart", me, Some(json!({ "productId": widget.id, "quantity": 3 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["kind"], "insufficient_stock");
        assert_eq!(value["available"], 2);
        assert_eq!(value["message"], "Only 2 units available in stock");

        let (status, value) = app.call(Method::POST, "/api/customer/orders", me, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["kind"], "empty_cart");

        let (status, value) = app.call(Method::GET, &format!("/api/customer/orders/{}", Uuid::now_v7()), me, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["message"], "Order not found");

        let (status, value) = app.call(Method::POST, "/api/customer/cart", me, Some(json!({ "productId": "nope" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn admin_manages_catalog_and_order_status() {
        let app = TestApp::new();
        let admin = Some((Uuid::now_v7(), "admin"));
        let body = json!({
            "name": "Kettle",
            "description": "Steel kettle",
            "price": "40.00",
            "stock": 4,
            "category": "Kitchen",
            "image": "kettle.png"
        });
        let (status, value) = app.call(Method::POST, "/api/admin/products", admin, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        let product_id = value["product"]["id"].as_str().unwrap().to_string();

        let (status, value) =
            app.call(Method::PUT, &format!("/api/admin/products/{product_id}"), admin, Some(json!({ "stock": 0 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["product"]["stock"], 0);
        assert_eq!(value["product"]["price"], "40.00");

        let owner = app.register().await;
        let me = Some((owner, "customer"));
        let (_, value) = app.call(Method::GET, "/api/customer/products", me, None).await;
        assert_eq!(value["count"], 0);

        app.call(Method::PUT, &format!("/api/admin/products/{product_id}"), admin, Some(json!({ "stock": 4 }))).await;
        app.call(Method::POST, "/api/customer/cart", me, Some(json!({ "productId": product_id, "quantity": 1 }))).await;
        let (_, value) = app.call(Method::POST, "/api/customer/orders", me, None).await;
        let order_id = value["order"]["id"].as_str().unwrap().to_string();

        let uri = format!("/api/admin/orders/{order_id}/status");
        let (status, _) = app.call(Method::PUT, &uri, admin, Some(json!({ "status": "Delivered" }))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, value) = app.call(Method::PUT, &format!("/api/customer/orders/{order_id}/cancel"), me, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(value["message"], "Delivered orders cannot be cancelled");

        let (_, value) = app.call(Method::GET, "/api/admin/dashboard", admin, None).await;
        assert_eq!(value["metrics"]["totalSales"], "47.20");
    }
}

//! Application services over the store.

mod accounts;
mod cart;
mod catalog;
mod coupons;
mod dashboard;
mod orders;

pub use accounts::{AccountService, Registration};
pub use cart::CartService;
pub use catalog::CatalogService;
pub use coupons::CouponService;
pub use dashboard::{DashboardService, LOW_STOCK_THRESHOLD};
pub use orders::OrderService;

use std::sync::Arc;

use crate::domain::aggregates::Pricing;
use crate::publisher::EventPublisher;
use crate::store::Store;

#[derive(Clone)]
pub struct Services {
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub cart: CartService,
    pub orders: OrderService,
    pub coupons: CouponService,
    pub dashboard: DashboardService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, pricing: Pricing, publisher: EventPublisher) -> Self {
        Self {
            accounts: AccountService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            cart: CartService::new(store.clone(), pricing, publisher.clone()),
            orders: OrderService::new(store.clone(), pricing, publisher),
            coupons: CouponService::new(store.clone()),
            dashboard: DashboardService::new(store),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;
    use crate::domain::aggregates::{Coupon, Product};
    use crate::store::{CouponRepository, MemoryStore, ProductRepository};

    pub(crate) fn services() -> (Arc<MemoryStore>, Services) {
        let store = Arc::new(MemoryStore::new());
        let services = Services::new(store.clone(), Pricing::default(), EventPublisher::default());
        (store, services)
    }

    pub(crate) fn registration(mobile_number: &str) -> Registration {
        Registration {
            name: "Asha".into(),
            address: "12 Lake Road".into(),
            mobile_number: mobile_number.into(),
            date_of_birth: NaiveDate::from_ymd_opt(1994, 5, 17).unwrap(),
            email: Some("asha@example.com".into()),
            password: "Secret#123".into(),
        }
    }

    pub(crate) async fn customer(services: &Services) -> Uuid {
        services.accounts.register(registration("9876543210")).await.unwrap().id
    }

    pub(crate) async fn stocked(store: &MemoryStore, name: &str, price: i64, stock: i32) -> Product {
        let product = crate::domain::aggregates::product::sample(name, price, stock);
        store.insert_product(&product).await.unwrap();
        product
    }

    pub(crate) async fn coupon(store: &MemoryStore, code: &str, percent: i64, minimum: i64) -> Coupon {
        let coupon = crate::domain::aggregates::coupon::sample(code, percent, minimum);
        store.insert_coupon(&coupon).await.unwrap();
        coupon
    }
}

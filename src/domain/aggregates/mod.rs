//! Aggregates module
pub mod cart;
pub mod coupon;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem, CartTotals, Pricing};
pub use coupon::{Coupon, CouponChanges, NewCoupon};
pub use order::{Order, OrderLine, OrderStatus};
pub use product::{NewProduct, Product, ProductChanges};
pub use user::{NewUser, ProfileChanges, Role, User};

//! Storefront backend
//!
//! Self-hosted shop backend for a single storefront.
//!
//! ## Features
//! - Customer accounts and admin bootstrap
//! - Product catalog browsing and administration
//! - Shopping cart with single-coupon discounting and 18% tax
//! - Order placement with atomic stock adjustment and cancellation
//! - Coupon administration and sales dashboard

pub mod api;
pub mod config;
pub mod domain;
pub mod publisher;
pub mod services;
pub mod store;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::Money;

// =============================================================================
// Error Types
// =============================================================================

/// Coarse classification of [`EcommerceError`], stable for callers that only
/// need to branch on the kind of failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Unavailable,
    InsufficientStock,
    InvalidInput,
    Conflict,
    EmptyCart,
    Unauthorized,
    Internal,
}

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("Product not found")]
    ProductNotFound(Uuid),

    #[error("Item not found in cart")]
    CartItemNotFound(Uuid),

    #[error("Cart not found")]
    CartNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Coupon not found")]
    CouponNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Product is not available")]
    ProductUnavailable(Uuid),

    #[error("Only {available} units{} available in stock", stock_subject(.product_name))]
    InsufficientStock {
        product_id: Uuid,
        product_name: Option<String>,
        available: i32,
    },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("This coupon is already applied to your cart")]
    CouponAlreadyApplied(String),

    #[error("Coupon \"{applied}\" is already applied to your cart. Please remove it first before applying a new coupon.")]
    ConflictingCoupon { applied: String },

    #[error("Invalid or expired coupon code")]
    InvalidOrExpiredCoupon,

    #[error("Minimum cart value of {minimum} required for this coupon")]
    MinimumCartValueNotMet { minimum: Money },

    #[error("Coupon code already exists")]
    DuplicateCoupon(String),

    #[error("User with this mobile number already exists")]
    DuplicateAccount,

    #[error("Delivered orders cannot be cancelled")]
    AlreadyDelivered,

    #[error("Order is already cancelled")]
    AlreadyCancelled,

    #[error("Cannot move order from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EcommerceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProductNotFound(_)
            | Self::CartItemNotFound(_)
            | Self::CartNotFound
            | Self::OrderNotFound
            | Self::CouponNotFound
            | Self::UserNotFound => ErrorKind::NotFound,
            Self::ProductUnavailable(_)
            | Self::InvalidOrExpiredCoupon
            | Self::MinimumCartValueNotMet { .. } => ErrorKind::Unavailable,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            Self::InvalidQuantity(_) | Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::EmptyCart => ErrorKind::EmptyCart,
            Self::CouponAlreadyApplied(_)
            | Self::ConflictingCoupon { .. }
            | Self::DuplicateCoupon(_)
            | Self::DuplicateAccount
            | Self::AlreadyDelivered
            | Self::AlreadyCancelled
            | Self::InvalidStatusTransition { .. } => ErrorKind::Conflict,
            Self::InvalidCredentials => ErrorKind::Unauthorized,
            Self::StorageError(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<sqlx::Error> for EcommerceError {
    fn from(e: sqlx::Error) -> Self {
        EcommerceError::StorageError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;

fn stock_subject(name: &Option<String>) -> String {
    name.as_deref().map(|n| format!(" of {n}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn insufficient_stock_message_names_product_when_known() {
        let err = EcommerceError::InsufficientStock {
            product_id: Uuid::nil(),
            product_name: Some("Kettle".into()),
            available: 2,
        };
        assert_eq!(err.to_string(), "Only 2 units of Kettle available in stock");
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let err = EcommerceError::InsufficientStock { product_id: Uuid::nil(), product_name: None, available: 0 };
        assert_eq!(err.to_string(), "Only 0 units available in stock");
    }

    #[test]
    fn coupon_failures_are_classified() {
        assert_eq!(EcommerceError::CouponAlreadyApplied("SAVE10".into()).kind(), ErrorKind::Conflict);
        assert_eq!(EcommerceError::ConflictingCoupon { applied: "SAVE10".into() }.kind(), ErrorKind::Conflict);
        let err = EcommerceError::MinimumCartValueNotMet { minimum: Money::new(Decimal::new(500, 0)) };
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(err.to_string(), "Minimum cart value of 500.00 required for this coupon");
    }
}

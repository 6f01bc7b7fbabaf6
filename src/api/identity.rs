//! Caller identity as asserted by the upstream gateway.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use super::error::ApiError;
use crate::domain::aggregates::Role;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

fn parse_role(value: &str) -> Option<Role> {
    match value.to_ascii_lowercase().as_str() {
        "customer" => Some(Role::Customer),
        "admin" => Some(Role::Admin),
        _ => None,
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER).and_then(|v| Uuid::parse_str(v).ok()).ok_or(ApiError::Unauthenticated)?;
        let role = header(parts, USER_ROLE_HEADER).and_then(parse_role).ok_or(ApiError::Unauthenticated)?;
        Ok(Self { user_id, role })
    }
}

/// An authenticated customer.
#[derive(Clone, Copy, Debug)]
pub struct Customer(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Customer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Identity::from_request_parts(parts, state).await? {
            Identity { user_id, role: Role::Customer } => Ok(Self(user_id)),
            _ => Err(ApiError::Forbidden),
        }
    }
}

/// An authenticated admin.
#[derive(Clone, Copy, Debug)]
pub struct Admin(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Identity::from_request_parts(parts, state).await? {
            Identity { user_id, role: Role::Admin } => Ok(Self(user_id)),
            _ => Err(ApiError::Forbidden),
        }
    }
}

//! Customer accounts and the admin bootstrap.
//!
//! Identity itself comes from the gateway; this service only owns the
//! account records and password checks.

use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::config::AdminSeed;
use crate::domain::aggregates::{Cart, NewUser, ProfileChanges, Role, User};
use crate::domain::value_objects::Patch;
use crate::store::Store;
use crate::{EcommerceError, Result};

const WEAK_PASSWORD: &str =
    "Password must be at least 8 characters long and include uppercase, lowercase, numbers and special characters";

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(custom = "validate_mobile_number")]
    pub mobile_number: String,
    pub date_of_birth: NaiveDate,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    #[validate(custom = "validate_password_strength")]
    pub password: String,
}

fn validate_mobile_number(value: &str) -> std::result::Result<(), ValidationError> {
    if value.len() == 10 && value.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(());
    }
    let mut error = ValidationError::new("mobile_number");
    error.message = Some("Please provide a valid 10-digit mobile number".into());
    Err(error)
}

fn validate_password_strength(value: &str) -> std::result::Result<(), ValidationError> {
    let strong = value.chars().count() >= 8
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().any(|c| !c.is_ascii_alphanumeric());
    if strong {
        return Ok(());
    }
    let mut error = ValidationError::new("weak_password");
    error.message = Some(WEAK_PASSWORD.into());
    Err(error)
}

/// First message of the first failing field, fields taken in name order.
fn invalid_input(errors: ValidationErrors) -> EcommerceError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);
    let message = fields
        .iter()
        .flat_map(|(field, errs)| errs.iter().map(move |e| (field, e)))
        .map(|(field, e)| e.message.as_ref().map_or_else(|| format!("Invalid {field}"), |m| m.to_string()))
        .next()
        .unwrap_or_else(|| "Invalid input".to_string());
    EcommerceError::InvalidInput(message)
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes()).map_err(|e| EcommerceError::Internal(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| EcommerceError::Internal(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    /// Creates a customer together with its empty cart.
    pub async fn register(&self, registration: Registration) -> Result<User> {
        registration.validate().map_err(invalid_input)?;
        if self.store.find_user_by_mobile(&registration.mobile_number, Role::Customer).await?.is_some() {
            return Err(EcommerceError::DuplicateAccount);
        }
        let user = User::create(NewUser {
            name: registration.name,
            address: registration.address,
            mobile_number: registration.mobile_number,
            date_of_birth: registration.date_of_birth,
            email: registration.email,
            password_hash: hash_password(&registration.password)?,
            role: Role::Customer,
        });
        self.store.insert_user_with_cart(&user, &Cart::new(user.id)).await?;
        tracing::info!(user_id = %user.id, "customer registered");
        Ok(user)
    }

    /// Checks a password login for an account with the given role.
    pub async fn authenticate(&self, mobile_number: &str, password: &str, role: Role) -> Result<User> {
        let user = self
            .store
            .find_user_by_mobile(mobile_number.trim(), role)
            .await?
            .ok_or(EcommerceError::InvalidCredentials)?;
        if !verify_password(password, &user.password_hash) {
            tracing::info!(user_id = %user.id, "password mismatch");
            return Err(EcommerceError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User> {
        self.store.get_user(user_id).await
    }

    pub async fn update_profile(&self, user_id: Uuid, changes: ProfileChanges) -> Result<User> {
        if let Patch::Value(name) = &changes.name {
            if name.trim().is_empty() {
                return Err(EcommerceError::InvalidInput("Name is required".into()));
            }
        }
        if let Patch::Value(address) = &changes.address {
            if address.trim().is_empty() {
                return Err(EcommerceError::InvalidInput("Address is required".into()));
            }
        }
        if let Patch::Value(email) = &changes.email {
            if !email.trim().is_empty() && !validator::validate_email(email.trim()) {
                return Err(EcommerceError::InvalidInput("Please provide a valid email".into()));
            }
        }
        let mut user = self.store.get_user(user_id).await?;
        user.apply_changes(changes);
        self.store.save_user(&user).await?;
        tracing::info!(%user_id, "profile updated");
        Ok(user)
    }

    /// Creates the admin account from `seed` unless an admin already exists.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, seed: &AdminSeed) -> Result<bool> {
        if self.store.admin_exists().await? {
            tracing::info!("admin account already exists");
            return Ok(false);
        }
        let date_of_birth =
            NaiveDate::from_ymd_opt(1990, 1, 1).ok_or_else(|| EcommerceError::Internal("invalid admin birth date".into()))?;
        let admin = User::create(NewUser {
            name: "Admin".into(),
            address: "Admin Office".into(),
            mobile_number: seed.mobile_number.clone(),
            date_of_birth,
            email: Some("admin@example.com".into()),
            password_hash: hash_password(&seed.password)?,
            role: Role::Admin,
        });
        self.store.insert_user_with_cart(&admin, &Cart::new(admin.id)).await?;
        tracing::info!(mobile_number = %admin.mobile_number, "admin account created");
        Ok(true)
    }
}

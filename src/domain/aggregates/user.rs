//! User Aggregate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::Patch;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub mobile_number: String,
    pub date_of_birth: NaiveDate,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration data after validation; the password is already hashed.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub address: String,
    pub mobile_number: String,
    pub date_of_birth: NaiveDate,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    #[serde(default)] pub name: Patch<String>,
    #[serde(default)] pub address: Patch<String>,
    #[serde(default)] pub date_of_birth: Patch<NaiveDate>,
    /// An empty string clears the email.
    #[serde(default)] pub email: Patch<String>,
}

impl User {
    pub fn create(new: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: new.name.trim().to_string(),
            address: new.address,
            mobile_number: new.mobile_number,
            date_of_birth: new.date_of_birth,
            email: normalise_email(new.email),
            password_hash: new.password_hash,
            role: new.role,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    pub fn apply_changes(&mut self, changes: ProfileChanges) {
        changes.name.apply_to(&mut self.name);
        changes.address.apply_to(&mut self.address);
        changes.date_of_birth.apply_to(&mut self.date_of_birth);
        if let Patch::Value(email) = changes.email {
            self.email = normalise_email(Some(email));
        }
        self.updated_at = Utc::now();
    }
}

fn normalise_email(email: Option<String>) -> Option<String> {
    email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> User {
        User::create(NewUser {
            name: " Asha ".into(), address: "12 Market Road".into(), mobile_number: "9876543210".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1994, 5, 17).unwrap(), email: Some("Asha@Example.com".into()),
            password_hash: "hash".into(), role: Role::Customer,
        })
    }

    #[test]
    fn test_create_normalises() {
        let user = customer();
        assert_eq!(user.name, "Asha");
        assert_eq!(user.email.as_deref(), Some("asha@example.com"));
        assert!(!user.is_admin());
    }

    #[test]
    fn test_profile_changes_only_touch_present_fields() {
        let mut user = customer();
        user.apply_changes(ProfileChanges { address: Patch::Value("7 Lake View".into()), email: Patch::Value(String::new()), ..Default::default() });
        assert_eq!(user.address, "7 Lake View");
        assert_eq!(user.email, None);
        assert_eq!(user.name, "Asha");
    }

    #[test]
    fn test_password_hash_never_serialised() {
        let json = serde_json::to_value(customer()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "customer");
    }
}

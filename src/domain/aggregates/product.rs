//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{Money, Patch};
use crate::{EcommerceError, Result};

/// Catalog product. The cart and order engines only read `price`,
/// `is_active` and `stock`, and only ever change `stock` through atomic
/// adjustments in the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: i32,
    pub category: String,
    pub image: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub stock: i32,
    pub category: String,
    pub image: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool { true }

/// Partial product update. `stock` is only written when explicitly present,
/// so an update never clobbers concurrent stock adjustments.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductChanges {
    #[serde(default)] pub name: Patch<String>,
    #[serde(default)] pub description: Patch<String>,
    #[serde(default)] pub price: Patch<Money>,
    #[serde(default)] pub stock: Patch<i32>,
    #[serde(default)] pub category: Patch<String>,
    #[serde(default)] pub image: Patch<String>,
    #[serde(default)] pub is_active: Patch<bool>,
}

impl ProductChanges {
    pub fn validate(&self) -> Result<()> {
        if let Patch::Value(name) = &self.name { require_text("name", name)?; }
        if let Patch::Value(category) = &self.category { require_text("category", category)?; }
        if let Patch::Value(price) = &self.price { check_price(*price)?; }
        if let Patch::Value(stock) = &self.stock { check_stock(*stock)?; }
        Ok(())
    }

    pub fn apply(self, product: &mut Product) {
        self.name.apply_to(&mut product.name);
        self.description.apply_to(&mut product.description);
        self.price.apply_to(&mut product.price);
        self.stock.apply_to(&mut product.stock);
        self.category.apply_to(&mut product.category);
        self.image.apply_to(&mut product.image);
        self.is_active.apply_to(&mut product.is_active);
        product.updated_at = Utc::now();
    }
}

impl Product {
    pub fn create(new: NewProduct) -> Result<Self> {
        require_text("name", &new.name)?;
        require_text("category", &new.category)?;
        check_price(new.price)?;
        check_stock(new.stock)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            name: new.name.trim().to_string(),
            description: new.description,
            price: new.price,
            stock: new.stock,
            category: new.category.trim().to_string(),
            image: new.image,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn ensure_available(&self) -> Result<()> {
        if !self.is_active { return Err(EcommerceError::ProductUnavailable(self.id)); }
        Ok(())
    }

    pub fn ensure_stock(&self, quantity: i32) -> Result<()> {
        if self.stock < quantity {
            return Err(EcommerceError::InsufficientStock { product_id: self.id, product_name: None, available: self.stock });
        }
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() { return Err(EcommerceError::InvalidInput(format!("Product {field} is required"))); }
    Ok(())
}

fn check_price(price: Money) -> Result<()> {
    if price.is_negative() { return Err(EcommerceError::InvalidInput("Price cannot be negative".into())); }
    Ok(())
}

fn check_stock(stock: i32) -> Result<()> {
    if stock < 0 { return Err(EcommerceError::InvalidInput("Stock cannot be negative".into())); }
    Ok(())
}

#[cfg(test)]
pub(crate) fn sample(name: &str, price: i64, stock: i32) -> Product {
    Product::create(NewProduct {
        name: name.into(), description: format!("{name} description"), price: Money::from_major(price),
        stock, category: "Kitchen".into(), image: "img.png".into(), is_active: true,
    }).unwrap()
}

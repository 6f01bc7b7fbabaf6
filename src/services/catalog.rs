//! Catalog browsing and administration.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::aggregates::{NewProduct, Product, ProductChanges};
use crate::store::{ProductFilter, Store};
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    /// Products a customer can buy right now, narrowed by `filter`.
    pub async fn browse(&self, filter: ProductFilter) -> Result<Vec<Product>> {
        self.store.list_products(&ProductFilter { only_available: true, ..filter }).await
    }

    /// Inactive products are hidden from customers.
    pub async fn product(&self, id: Uuid) -> Result<Product> {
        let product = self.store.get_product(id).await?;
        if !product.is_active {
            return Err(EcommerceError::ProductNotFound(id));
        }
        Ok(product)
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        self.store.list_categories().await
    }

    pub async fn all_products(&self) -> Result<Vec<Product>> {
        self.store.list_products(&ProductFilter::default()).await
    }

    pub async fn create_product(&self, new: NewProduct) -> Result<Product> {
        let product = Product::create(new)?;
        self.store.insert_product(&product).await?;
        tracing::info!(product_id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: Uuid, changes: ProductChanges) -> Result<Product> {
        changes.validate()?;
        let product = self.store.update_product(id, &changes).await?;
        tracing::info!(product_id = %id, "product updated");
        Ok(product)
    }

    pub async fn delete_product(&self, id: Uuid) -> Result<()> {
        self.store.delete_product(id).await?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Money, Patch};
    use crate::services::testing::{services, stocked};

    #[tokio::test]
    async fn customers_only_see_buyable_products() {
        let (store, services) = services();
        let kettle = stocked(&store, "Kettle", 40, 3).await;
        let sold_out = stocked(&store, "Toaster", 60, 0).await;
        let hidden = stocked(&store, "Blender", 80, 9).await;
        services.catalog.update_product(hidden.id, ProductChanges { is_active: Patch::Value(false), ..Default::default() }).await.unwrap();

        let visible: Vec<Uuid> = services.catalog.browse(ProductFilter::default()).await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(visible, vec![kettle.id]);
        assert!(matches!(services.catalog.product(hidden.id).await, Err(EcommerceError::ProductNotFound(_))));
        assert_eq!(services.catalog.product(sold_out.id).await.unwrap().name, "Toaster");
        assert_eq!(services.catalog.all_products().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn price_range_filter_is_inclusive() {
        let (store, services) = services();
        stocked(&store, "Cheap", 10, 1).await;
        let mid = stocked(&store, "Mid", 50, 1).await;
        stocked(&store, "Dear", 90, 1).await;

        let filter = ProductFilter { min_price: Some(Money::from_major(50)), max_price: Some(Money::from_major(50)), ..Default::default() };
        let found = services.catalog.browse(filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, mid.id);
    }

    #[tokio::test]
    async fn explicit_zero_stock_and_price_are_applied() {
        let (store, services) = services();
        let kettle = stocked(&store, "Kettle", 40, 3).await;
        let changes = ProductChanges { stock: Patch::Value(0), price: Patch::Value(Money::zero()), ..Default::default() };
        let updated = services.catalog.update_product(kettle.id, changes).await.unwrap();
        assert_eq!(updated.stock, 0);
        assert_eq!(updated.price, Money::zero());
        assert_eq!(updated.name, "Kettle");

        let bad = ProductChanges { stock: Patch::Value(-1), ..Default::default() };
        assert!(matches!(services.catalog.update_product(kettle.id, bad).await, Err(EcommerceError::InvalidInput(_))));
        assert!(matches!(services.catalog.delete_product(Uuid::now_v7()).await, Err(EcommerceError::ProductNotFound(_))));
    }
}

//! Catalog management service.

use common::ProductId;
use domain::{NewProduct, Product, ProductPatch};
use store::{ProductFilter, Store};

/// Service for managing the product catalog.
///
/// Wraps the store with per-operation tracing and metrics. Validation
/// and name-uniqueness live in the domain types and the store; this
/// layer only orchestrates.
#[derive(Clone)]
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    /// Creates a new catalog service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a product.
    #[tracing::instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create(&self, new: NewProduct) -> store::Result<Product> {
        let product = self.store.create_product(new).await?;
        metrics::counter!("catalog_products_created_total").increment(1);
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Loads a product by id.
    pub async fn get(&self, id: ProductId) -> store::Result<Product> {
        self.store.product(id).await
    }

    /// Lists products, ordered by name.
    pub async fn list(&self, filter: ProductFilter) -> store::Result<Vec<Product>> {
        self.store.list_products(filter).await
    }

    /// Applies a partial update.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: ProductId, patch: ProductPatch) -> store::Result<Product> {
        self.store.update_product(id, patch).await
    }

    /// Soft-deletes a product.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate(&self, id: ProductId) -> store::Result<Product> {
        let product = self.store.deactivate_product(id).await?;
        metrics::counter!("catalog_products_deactivated_total").increment(1);
        tracing::info!(product_id = %product.id, "product deactivated");
        Ok(product)
    }

    /// Lists active products whose stock has fallen below their
    /// minimum threshold, for restocking screens.
    pub async fn low_stock(&self) -> store::Result<Vec<Product>> {
        let products = self.store.list_products(ProductFilter::ActiveOnly).await?;
        Ok(products.into_iter().filter(Product::below_minimum).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Money;
    use store::{InMemoryStore, StoreError};

    fn new_product(name: &str, stock: u32, min_stock: u32) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price: Money::from_cents(1000),
            detail: None,
            photo: None,
            listed: true,
            stock,
            min_stock,
        }
    }

    #[tokio::test]
    async fn create_and_reload() {
        let service = CatalogService::new(InMemoryStore::new());
        let created = service.create(new_product("Lasagna", 5, 1)).await.unwrap();
        let loaded = service.get(created.id).await.unwrap();
        assert_eq!(loaded, created);
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let service = CatalogService::new(InMemoryStore::new());
        service.create(new_product("Tarta", 5, 1)).await.unwrap();
        let err = service.create(new_product("Tarta", 2, 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::NameConflict { .. }));
    }

    #[tokio::test]
    async fn low_stock_reports_only_shortfalls() {
        let service = CatalogService::new(InMemoryStore::new());
        service.create(new_product("Plenty", 10, 2)).await.unwrap();
        let short = service.create(new_product("Short", 1, 3)).await.unwrap();
        let gone = service.create(new_product("Gone", 0, 3)).await.unwrap();
        service.deactivate(gone.id).await.unwrap();

        let low = service.low_stock().await.unwrap();
        let ids: Vec<_> = low.iter().map(|p| p.id).collect();
        // Inactive products are not restock candidates.
        assert_eq!(ids, vec![short.id]);
    }
}

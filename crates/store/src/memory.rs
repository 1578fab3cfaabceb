//! In-memory store implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CustomerId, OrderId, ProductId};
use domain::{NewProduct, Order, OrderRequest, Product, ProductPatch, plan_consumption};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{OrderFilter, ProductFilter, Store},
};

#[derive(Default)]
struct Inner {
    products: HashMap<ProductId, Product>,
    // Insertion order doubles as creation order for listings.
    orders: Vec<Order>,
}

/// In-memory store for testing and standalone use.
///
/// Provides the same interface and unit-of-work guarantees as the
/// PostgreSQL implementation. The writer lock serializes conflicting
/// units; operations validate everything against the locked state
/// before mutating, so a failed unit leaves no partial writes behind.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    fn name_taken(inner: &Inner, name: &str, except: Option<ProductId>) -> bool {
        inner
            .products
            .values()
            .any(|p| p.name == name && Some(p.id) != except)
    }

    /// Resolves cart lines against the product map, preserving cart
    /// order. Every referenced product must exist and be active.
    fn resolve_cart(inner: &Inner, request: &OrderRequest) -> Result<Vec<(Product, u32)>> {
        let mut resolved = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = inner
                .products
                .get(&line.product_id)
                .ok_or(StoreError::ProductNotFound(line.product_id))?;
            if !product.active {
                return Err(domain::InventoryError::ProductUnavailable {
                    product_id: product.id,
                }
                .into());
            }
            resolved.push((product.clone(), line.quantity));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_product(&self, new: NewProduct) -> Result<Product> {
        new.validate()?;
        let mut inner = self.inner.write().await;
        if Self::name_taken(&inner, &new.name, None) {
            return Err(StoreError::NameConflict { name: new.name });
        }
        let product = new.into_product(ProductId::new());
        inner.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn product(&self, id: ProductId) -> Result<Product> {
        let inner = self.inner.read().await;
        inner
            .products
            .get(&id)
            .cloned()
            .ok_or(StoreError::ProductNotFound(id))
    }

    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>> {
        let inner = self.inner.read().await;
        let mut products: Vec<Product> = inner
            .products
            .values()
            .filter(|p| filter == ProductFilter::All || p.active)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product> {
        patch.validate()?;
        let mut inner = self.inner.write().await;
        if let Some(ref name) = patch.name
            && Self::name_taken(&inner, name, Some(id))
        {
            return Err(StoreError::NameConflict { name: name.clone() });
        }
        let product = inner
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;
        patch.apply_to(product);
        Ok(product.clone())
    }

    async fn deactivate_product(&self, id: ProductId) -> Result<Product> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;
        product.active = false;
        Ok(product.clone())
    }

    async fn create_order(
        &self,
        request: OrderRequest,
        customer: Option<CustomerId>,
    ) -> Result<Order> {
        request.validate()?;

        let mut inner = self.inner.write().await;
        let resolved = Self::resolve_cart(&inner, &request)?;

        // Register sales commit consumption at creation; online
        // orders consume nothing until registration.
        let decrements = match request.channel {
            domain::OrderChannel::Register => {
                plan_consumption(resolved.iter().map(|(p, q)| (p, *q)))?
            }
            domain::OrderChannel::Online => Vec::new(),
        };

        let order = Order::assemble(
            OrderId::new(),
            customer,
            Utc::now().date_naive(),
            &request,
            resolved,
        );

        for decrement in decrements {
            if let Some(product) = inner.products.get_mut(&decrement.product_id) {
                product.stock = decrement.new_stock;
            }
        }
        inner.orders.push(order.clone());
        Ok(order)
    }

    async fn order(&self, id: OrderId) -> Result<Order> {
        let inner = self.inner.read().await;
        inner
            .orders
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(id))
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .iter()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect())
    }

    async fn confirm_order(&self, id: OrderId) -> Result<Order> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StoreError::OrderNotFound(id))?;
        order.status.confirm();
        Ok(order.clone())
    }

    async fn register_order(&self, id: OrderId) -> Result<Order> {
        let mut inner = self.inner.write().await;

        let idx = inner
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or(StoreError::OrderNotFound(id))?;

        let mut status = inner.orders[idx].status;
        let first_registration = status.register()?;
        if !first_registration {
            // Already fulfilled: no state change, no second decrement.
            return Ok(inner.orders[idx].clone());
        }

        // Re-validate activity and stock against current product rows;
        // time has passed since the order was created.
        let demands: Vec<(ProductId, u32)> = inner.orders[idx]
            .lines
            .iter()
            .map(|l| (l.product.id, l.quantity))
            .collect();
        let mut pairs = Vec::with_capacity(demands.len());
        for (product_id, quantity) in &demands {
            let product = inner
                .products
                .get(product_id)
                .ok_or(StoreError::ProductNotFound(*product_id))?;
            pairs.push((product, *quantity));
        }
        let decrements = plan_consumption(pairs)?;

        for decrement in decrements {
            if let Some(product) = inner.products.get_mut(&decrement.product_id) {
                product.stock = decrement.new_stock;
            }
        }
        inner.orders[idx].status = status;
        Ok(inner.orders[idx].clone())
    }

    async fn mark_paid(&self, id: OrderId) -> Result<Order> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StoreError::OrderNotFound(id))?;
        order.status.mark_paid();
        Ok(order.clone())
    }
}

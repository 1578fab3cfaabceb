//! Catalog product types.

use common::ProductId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// Errors raised while validating catalog data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Product name must not be empty.
    #[error("product name must not be empty")]
    EmptyName,

    /// Product price must be strictly positive.
    #[error("invalid price: {cents} cents (must be greater than 0)")]
    InvalidPrice { cents: i64 },
}

/// A catalog product.
///
/// `active` is the soft-delete flag: an inactive product is excluded
/// from the public listing and unusable for new orders, but stays
/// referenceable by historical order lines. `listed` only controls
/// storefront visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Current price; order lines snapshot it at creation.
    pub price: Money,
    pub detail: Option<String>,
    /// Opaque photo filename; storage and serving are external.
    pub photo: Option<String>,
    pub listed: bool,
    pub stock: u32,
    pub min_stock: u32,
    pub active: bool,
}

impl Product {
    /// True when current stock has fallen below the minimum threshold.
    pub fn below_minimum(&self) -> bool {
        self.stock < self.min_stock
    }
}

/// Data for creating a product. The created product is always active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub detail: Option<String>,
    pub photo: Option<String>,
    pub listed: bool,
    pub stock: u32,
    pub min_stock: u32,
}

impl NewProduct {
    /// Validates the payload.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::EmptyName);
        }
        if !self.price.is_positive() {
            return Err(CatalogError::InvalidPrice {
                cents: self.price.cents(),
            });
        }
        Ok(())
    }

    /// Materializes the product under a fresh id.
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
            detail: self.detail,
            photo: self.photo,
            listed: self.listed,
            stock: self.stock,
            min_stock: self.min_stock,
            active: true,
        }
    }
}

/// Partial update for a product. Fields left as `None` are untouched.
///
/// Stock may be corrected here by an administrator; the ordering flow
/// itself only ever mutates stock through the consumption planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub detail: Option<String>,
    pub photo: Option<String>,
    pub listed: Option<bool>,
    pub stock: Option<u32>,
    pub min_stock: Option<u32>,
}

impl ProductPatch {
    /// Validates the supplied fields.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if let Some(ref name) = self.name
            && name.trim().is_empty()
        {
            return Err(CatalogError::EmptyName);
        }
        if let Some(price) = self.price
            && !price.is_positive()
        {
            return Err(CatalogError::InvalidPrice {
                cents: price.cents(),
            });
        }
        Ok(())
    }

    /// Applies the supplied fields to a product.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(ref name) = self.name {
            product.name = name.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(ref detail) = self.detail {
            product.detail = Some(detail.clone());
        }
        if let Some(ref photo) = self.photo {
            product.photo = Some(photo.clone());
        }
        if let Some(listed) = self.listed {
            product.listed = listed;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(min_stock) = self.min_stock {
            product.min_stock = min_stock;
        }
    }
}

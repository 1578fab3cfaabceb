//! Stock consumption planning.
//!
//! This module is the single authority on stock mutation: stores load
//! and lock the affected products, hand them to [`plan_consumption`],
//! and persist the returned decrements. A batch is all-or-nothing —
//! if any demand fails validation, no decrement is planned.

use std::collections::BTreeMap;

use common::ProductId;
use thiserror::Error;

use crate::product::Product;

/// Errors raised while validating a consumption batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// The product has been soft-deleted and cannot be sold.
    #[error("product {product_id} is unavailable")]
    ProductUnavailable { product_id: ProductId },

    /// Not enough stock to cover the requested quantity.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },
}

/// One planned stock write: the product's stock after the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDecrement {
    pub product_id: ProductId,
    pub new_stock: u32,
}

/// Validates a batch of (product, quantity) demands and plans the
/// resulting decrements.
///
/// Demands against the same product are merged before checking, so a
/// cart with two lines of the same product cannot pass individually
/// while exceeding stock jointly. Every product must be active and
/// hold at least the merged quantity. Decrements are returned in
/// product-id order; nothing is planned if any demand fails.
pub fn plan_consumption<'a, I>(demands: I) -> Result<Vec<StockDecrement>, InventoryError>
where
    I: IntoIterator<Item = (&'a Product, u32)>,
{
    let mut merged: BTreeMap<ProductId, (&Product, u32)> = BTreeMap::new();
    for (product, quantity) in demands {
        merged
            .entry(product.id)
            .and_modify(|(_, q)| *q += quantity)
            .or_insert((product, quantity));
    }

    let mut decrements = Vec::with_capacity(merged.len());
    for (product_id, (product, requested)) in merged {
        if !product.active {
            return Err(InventoryError::ProductUnavailable { product_id });
        }
        if product.stock < requested {
            return Err(InventoryError::InsufficientStock {
                product_id,
                requested,
                available: product.stock,
            });
        }
        decrements.push(StockDecrement {
            product_id,
            new_stock: product.stock - requested,
        });
    }
    Ok(decrements)
}

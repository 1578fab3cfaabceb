//! Store error types.

use common::{OrderId, ProductId};
use domain::{InventoryError, OrderError};
use thiserror::Error;

/// Errors surfaced by store operations.
///
/// Every variant except `Storage` is permanent for the given input.
/// `Storage` means the unit of work could not commit; since no partial
/// effect survives a failed unit, callers may safely retry the whole
/// operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No product with the given id.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// No order with the given id.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// Another product (active or inactive) already carries the name.
    #[error("a product named {name:?} already exists")]
    NameConflict { name: String },

    /// Stock validation failed; nothing was decremented.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Domain validation failed.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Catalog validation failed.
    #[error(transparent)]
    Catalog(#[from] domain::CatalogError),

    /// The storage engine failed; the unit of work was rolled back.
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl StoreError {
    /// True for the only possibly-transient kind.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Storage(_))
    }
}

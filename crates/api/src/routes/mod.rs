//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;

use service::{CatalogService, OrderService};
use store::Store;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub catalog: CatalogService<S>,
    pub orders: OrderService<S>,
}

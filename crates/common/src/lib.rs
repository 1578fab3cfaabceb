//! Shared identifier types used across the ordering backend.

mod types;

pub use types::{CustomerId, OrderId, ProductId};

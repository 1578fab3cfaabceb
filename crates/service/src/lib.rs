//! Application services over the store.
//!
//! Thin orchestration layer between the HTTP surface and the store:
//! shapes requests, delegates atomicity to the store, and emits
//! tracing spans and metrics per operation.

mod catalog;
mod orders;

pub use catalog::CatalogService;
pub use orders::OrderService;

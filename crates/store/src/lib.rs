//! Persistence boundary for the ordering backend.
//!
//! The [`Store`] trait is the consistency coordinator: every mutating
//! operation is one atomic unit of work — the order header, its lines
//! and any stock decrements land together or not at all. Two backends
//! implement it: [`InMemoryStore`] for tests and standalone use, and
//! [`PostgresStore`] over sqlx with row-level locking.

mod error;
mod memory;
mod postgres;
mod store;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{OrderFilter, ProductFilter, StateFilter, Store};

/// Convenience result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

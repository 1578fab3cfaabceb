//! Domain layer for the ordering backend.
//!
//! This crate is pure: it defines the catalog and order types, the
//! order status record with its guarded transitions, and the stock
//! consumption planner. All IO lives behind the `store` crate.

pub mod inventory;
pub mod money;
pub mod order;
pub mod product;

pub use inventory::{InventoryError, StockDecrement, plan_consumption};
pub use money::Money;
pub use order::{
    CartLine, Order, OrderChannel, OrderError, OrderLine, OrderRequest, OrderStatus, PaymentMethod,
};
pub use product::{CatalogError, NewProduct, Product, ProductPatch};

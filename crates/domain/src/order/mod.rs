//! Order aggregate and related types.

mod aggregate;
mod line;
mod payment;
mod status;

pub use aggregate::{CartLine, Order, OrderChannel, OrderRequest};
pub use line::OrderLine;
pub use payment::PaymentMethod;
pub use status::OrderStatus;

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// An order must contain at least one line.
    #[error("order has no lines")]
    EmptyOrder,

    /// The payment method tag is not one of the accepted set.
    #[error("invalid payment method: {given:?}")]
    InvalidPaymentMethod { given: String },

    /// Register sales represent a completed physical sale and must
    /// carry a payment method.
    #[error("register sales require a payment method")]
    PaymentMethodRequired,

    /// Line quantities must be strictly positive.
    #[error("invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Registration attempted before confirmation.
    #[error("order cannot be registered before it is confirmed")]
    NotConfirmed,
}

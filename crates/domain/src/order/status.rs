//! Order status record.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The lifecycle flags of an order.
///
/// The three facets are independent booleans rather than a single
/// enum: `paid` is orthogonal to the confirm → register progression.
/// The only ordering constraint is that an order must be confirmed
/// before it can be registered.
///
/// ```text
/// requested ──confirm──► confirmed ──register──► registered
///     (paid may flip to true at any point)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OrderStatus {
    /// An administrator has accepted the order.
    pub confirmed: bool,
    /// The order was handed over to the customer; stock has been
    /// committed exactly once.
    pub registered: bool,
    /// Payment has been received.
    pub paid: bool,
}

impl OrderStatus {
    /// Status of a freshly requested online order.
    pub fn requested() -> Self {
        Self::default()
    }

    /// Status of a register sale: confirmed, registered and paid in
    /// one step, since it represents an already-completed sale.
    pub fn register_sale() -> Self {
        Self {
            confirmed: true,
            registered: true,
            paid: true,
        }
    }

    /// Confirms the order. Idempotent: returns whether the flag
    /// actually changed.
    pub fn confirm(&mut self) -> bool {
        let changed = !self.confirmed;
        self.confirmed = true;
        changed
    }

    /// Marks the order paid. Idempotent.
    pub fn mark_paid(&mut self) -> bool {
        let changed = !self.paid;
        self.paid = true;
        changed
    }

    /// Registers (fulfills) the order.
    ///
    /// Fails with [`OrderError::NotConfirmed`] when the order was
    /// never confirmed. Returns `Ok(false)` when already registered,
    /// so callers know not to commit stock a second time.
    pub fn register(&mut self) -> Result<bool, OrderError> {
        if self.registered {
            return Ok(false);
        }
        if !self.confirmed {
            return Err(OrderError::NotConfirmed);
        }
        self.registered = true;
        Ok(true)
    }

    /// Requested but not yet confirmed nor fulfilled.
    pub fn is_solicited(&self) -> bool {
        !self.confirmed && !self.registered
    }

    /// Confirmed and awaiting pickup.
    pub fn is_pending_pickup(&self) -> bool {
        self.confirmed && !self.registered
    }

    /// Fulfilled.
    pub fn is_finalized(&self) -> bool {
        self.registered
    }
}

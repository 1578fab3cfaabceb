//! Order line items.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::product::Product;

/// One product-quantity-price entry within an order.
///
/// Created atomically with its parent order and never mutated
/// afterward. `unit_price` is captured at creation time and does not
/// track later repricing of the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// 1-based position within the order, in cart submission order.
    pub line_no: u32,
    /// The product as resolved for this order. The embedded record
    /// reflects the product row; the price that matters for the sale
    /// is `unit_price`.
    pub product: Product,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns the total price for this line.
    pub fn total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

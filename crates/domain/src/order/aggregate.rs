//! The order aggregate: header plus ordered line items.

use chrono::NaiveDate;
use common::{CustomerId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::product::Product;

use super::{OrderError, OrderLine, OrderStatus, PaymentMethod};

/// How the order entered the system. The channel decides the stock
/// policy: online orders consume nothing until registration, register
/// sales commit consumption at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderChannel {
    Online,
    Register,
}

impl OrderChannel {
    /// Returns the wire tag for this channel.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderChannel::Online => "online",
            OrderChannel::Register => "register",
        }
    }
}

/// One requested cart entry, before product resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A validated-but-unresolved order creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub lines: Vec<CartLine>,
    pub payment_method: Option<PaymentMethod>,
    pub observation: Option<String>,
    pub channel: OrderChannel,
}

impl OrderRequest {
    /// Validates the request shape: a non-empty cart, positive
    /// quantities, and a payment method when the sale happens at the
    /// register.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        for line in &self.lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    quantity: line.quantity,
                });
            }
        }
        if self.channel == OrderChannel::Register && self.payment_method.is_none() {
            return Err(OrderError::PaymentMethodRequired);
        }
        Ok(())
    }
}

/// A customer order: immutable header and lines, mutable status.
///
/// The customer reference, date, lines and captured prices are fixed
/// at creation; only the status flags advance afterward, through the
/// store's transition operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Absent for register (walk-in) sales.
    pub customer: Option<CustomerId>,
    pub date: NaiveDate,
    pub observation: Option<String>,
    /// Sum of line quantities, not the number of distinct lines.
    pub total_quantity: u32,
    pub status: OrderStatus,
    pub payment_method: Option<PaymentMethod>,
    pub channel: OrderChannel,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Assembles an order from resolved cart lines.
    ///
    /// Expects `resolved` in cart submission order; assigns sequence
    /// numbers 1..N, snapshots each product's current price, and sums
    /// quantities into the total. The request must already have been
    /// validated.
    pub fn assemble(
        id: OrderId,
        customer: Option<CustomerId>,
        date: NaiveDate,
        request: &OrderRequest,
        resolved: Vec<(Product, u32)>,
    ) -> Self {
        let lines: Vec<OrderLine> = resolved
            .into_iter()
            .enumerate()
            .map(|(idx, (product, quantity))| OrderLine {
                line_no: idx as u32 + 1,
                unit_price: product.price,
                product,
                quantity,
            })
            .collect();

        let total_quantity = lines.iter().map(|l| l.quantity).sum();
        let status = match request.channel {
            OrderChannel::Online => OrderStatus::requested(),
            OrderChannel::Register => OrderStatus::register_sale(),
        };

        Self {
            id,
            customer,
            date,
            observation: request.observation.clone(),
            total_quantity,
            status,
            payment_method: request.payment_method,
            channel: request.channel,
            lines,
        }
    }

    /// Returns the order total in money terms.
    pub fn total_amount(&self) -> Money {
        self.lines.iter().map(OrderLine::total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price_cents: i64) -> Product {
        Product {
            id: ProductId::new(),
            name: name.to_string(),
            price: Money::from_cents(price_cents),
            detail: None,
            photo: None,
            listed: true,
            stock: 50,
            min_stock: 0,
            active: true,
        }
    }

    fn online_request(lines: Vec<CartLine>) -> OrderRequest {
        OrderRequest {
            lines,
            payment_method: None,
            observation: None,
            channel: OrderChannel::Online,
        }
    }

    #[test]
    fn validate_rejects_empty_cart() {
        let request = online_request(vec![]);
        assert_eq!(request.validate(), Err(OrderError::EmptyOrder));
    }

    #[test]
    fn validate_rejects_zero_quantity() {
        let request = online_request(vec![CartLine {
            product_id: ProductId::new(),
            quantity: 0,
        }]);
        assert_eq!(
            request.validate(),
            Err(OrderError::InvalidQuantity { quantity: 0 })
        );
    }

    #[test]
    fn register_sale_requires_payment_method() {
        let mut request = online_request(vec![CartLine {
            product_id: ProductId::new(),
            quantity: 1,
        }]);
        request.channel = OrderChannel::Register;
        assert_eq!(request.validate(), Err(OrderError::PaymentMethodRequired));

        request.payment_method = Some(PaymentMethod::Cash);
        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn online_order_may_omit_payment_method() {
        let request = online_request(vec![CartLine {
            product_id: ProductId::new(),
            quantity: 1,
        }]);
        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn assemble_sums_quantities_and_numbers_lines() {
        let products = vec![
            (product("Ravioles", 1000), 2),
            (product("Lasagna", 1500), 3),
            (product("Tarta", 900), 1),
        ];
        let cart = products
            .iter()
            .map(|(p, q)| CartLine {
                product_id: p.id,
                quantity: *q,
            })
            .collect();
        let request = online_request(cart);

        let order = Order::assemble(
            OrderId::new(),
            Some(CustomerId::new()),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            &request,
            products,
        );

        assert_eq!(order.total_quantity, 6);
        let numbers: Vec<u32> = order.lines.iter().map(|l| l.line_no).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(order.total_amount().cents(), 2 * 1000 + 3 * 1500 + 900);
        assert!(order.status.is_solicited());
    }

    #[test]
    fn assemble_snapshots_price_at_creation() {
        let mut p = product("Empanada", 100);
        let request = online_request(vec![CartLine {
            product_id: p.id,
            quantity: 1,
        }]);
        let order = Order::assemble(
            OrderId::new(),
            None,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            &request,
            vec![(p.clone(), 1)],
        );

        // Later repricing must not affect the captured line price.
        p.price = Money::from_cents(150);
        assert_eq!(order.lines[0].unit_price.cents(), 100);
    }

    #[test]
    fn register_channel_creates_finalized_order() {
        let p = product("Flan", 500);
        let request = OrderRequest {
            lines: vec![CartLine {
                product_id: p.id,
                quantity: 2,
            }],
            payment_method: Some(PaymentMethod::Cash),
            observation: Some("walk-in".to_string()),
            channel: OrderChannel::Register,
        };
        let order = Order::assemble(
            OrderId::new(),
            None,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            &request,
            vec![(p, 2)],
        );

        assert!(order.customer.is_none());
        assert!(order.status.confirmed);
        assert!(order.status.registered);
        assert!(order.status.paid);
        assert_eq!(order.payment_method, Some(PaymentMethod::Cash));
    }
}

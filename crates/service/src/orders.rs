//! Order lifecycle service.

use common::{CustomerId, OrderId};
use domain::{CartLine, Order, OrderChannel, OrderRequest, PaymentMethod};
use store::{OrderFilter, Store};

/// Service for placing and advancing orders.
///
/// The store carries the atomicity guarantees; this layer shapes the
/// two entry channels and records lifecycle metrics.
#[derive(Clone)]
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Places an online order for a customer. No stock is consumed
    /// until the order is registered at pickup.
    #[tracing::instrument(skip(self, lines, observation), fields(customer = %customer))]
    pub async fn place_order(
        &self,
        customer: CustomerId,
        lines: Vec<CartLine>,
        payment_method: Option<PaymentMethod>,
        observation: Option<String>,
    ) -> store::Result<Order> {
        let request = OrderRequest {
            lines,
            payment_method,
            observation,
            channel: OrderChannel::Online,
        };
        let order = self.store.create_order(request, Some(customer)).await?;
        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(order_id = %order.id, quantity = order.total_quantity, "order placed");
        Ok(order)
    }

    /// Records a walk-in sale at the register: the order is created
    /// confirmed, registered and paid, and stock is committed in the
    /// same unit of work.
    #[tracing::instrument(skip(self, lines, observation))]
    pub async fn register_sale(
        &self,
        lines: Vec<CartLine>,
        payment_method: PaymentMethod,
        observation: Option<String>,
    ) -> store::Result<Order> {
        let request = OrderRequest {
            lines,
            payment_method: Some(payment_method),
            observation,
            channel: OrderChannel::Register,
        };
        let order = self.store.create_order(request, None).await?;
        metrics::counter!("register_sales_total").increment(1);
        tracing::info!(order_id = %order.id, quantity = order.total_quantity, "register sale recorded");
        Ok(order)
    }

    /// Loads an order by id.
    pub async fn get(&self, id: OrderId) -> store::Result<Order> {
        self.store.order(id).await
    }

    /// Lists orders matching the filter, oldest first.
    pub async fn list(&self, filter: OrderFilter) -> store::Result<Vec<Order>> {
        self.store.list_orders(filter).await
    }

    /// Confirms an order. Idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, id: OrderId) -> store::Result<Order> {
        let order = self.store.confirm_order(id).await?;
        metrics::counter!("orders_confirmed_total").increment(1);
        Ok(order)
    }

    /// Registers (fulfills) an order, committing its stock consumption.
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, id: OrderId) -> store::Result<Order> {
        let order = self.store.register_order(id).await?;
        metrics::counter!("orders_registered_total").increment(1);
        tracing::info!(order_id = %order.id, "order registered");
        Ok(order)
    }

    /// Marks an order paid. Idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn mark_paid(&self, id: OrderId) -> store::Result<Order> {
        self.store.mark_paid(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, NewProduct, OrderError};
    use store::{InMemoryStore, StoreError};

    async fn seed_product(store: &InMemoryStore, name: &str, stock: u32) -> domain::Product {
        store
            .create_product(NewProduct {
                name: name.to_string(),
                price: Money::from_cents(1000),
                detail: None,
                photo: None,
                listed: true,
                stock,
                min_stock: 0,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn placed_order_starts_solicited() {
        let store = InMemoryStore::new();
        let p = seed_product(&store, "Ravioles", 5).await;
        let service = OrderService::new(store);

        let order = service
            .place_order(
                CustomerId::new(),
                vec![CartLine {
                    product_id: p.id,
                    quantity: 2,
                }],
                None,
                Some("no onions".to_string()),
            )
            .await
            .unwrap();

        assert!(order.status.is_solicited());
        assert_eq!(order.observation.as_deref(), Some("no onions"));
        assert_eq!(order.channel, OrderChannel::Online);
    }

    #[tokio::test]
    async fn register_sale_is_finalized_and_anonymous() {
        let store = InMemoryStore::new();
        let p = seed_product(&store, "Flan", 5).await;
        let service = OrderService::new(store.clone());

        let sale = service
            .register_sale(
                vec![CartLine {
                    product_id: p.id,
                    quantity: 2,
                }],
                PaymentMethod::Cash,
                None,
            )
            .await
            .unwrap();

        assert!(sale.status.is_finalized());
        assert!(sale.customer.is_none());
        assert_eq!(store.product(p.id).await.unwrap().stock, 3);
    }

    #[tokio::test]
    async fn register_without_confirm_is_rejected() {
        let store = InMemoryStore::new();
        let p = seed_product(&store, "Tarta", 5).await;
        let service = OrderService::new(store);

        let order = service
            .place_order(
                CustomerId::new(),
                vec![CartLine {
                    product_id: p.id,
                    quantity: 1,
                }],
                None,
                None,
            )
            .await
            .unwrap();

        let err = service.register(order.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Order(OrderError::NotConfirmed)));
    }

    #[tokio::test]
    async fn full_lifecycle() {
        let store = InMemoryStore::new();
        let p = seed_product(&store, "Milanesa", 5).await;
        let service = OrderService::new(store.clone());

        let order = service
            .place_order(
                CustomerId::new(),
                vec![CartLine {
                    product_id: p.id,
                    quantity: 3,
                }],
                Some(PaymentMethod::Transfer),
                None,
            )
            .await
            .unwrap();

        service.confirm(order.id).await.unwrap();
        service.mark_paid(order.id).await.unwrap();
        let done = service.register(order.id).await.unwrap();

        assert!(done.status.is_finalized());
        assert!(done.status.paid);
        assert_eq!(store.product(p.id).await.unwrap().stock, 2);
    }
}

//! The store trait and its query filters.

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{CustomerId, OrderId, ProductId};
use domain::{NewProduct, Order, OrderRequest, Product, ProductPatch};

use crate::Result;

/// Catalog listing scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductFilter {
    /// Active products only, for the public catalog.
    #[default]
    ActiveOnly,
    /// Every product including soft-deleted ones, for administration.
    All,
}

/// Lifecycle slice of the order list, matching the admin screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFilter {
    /// Requested, neither confirmed nor registered.
    Solicited,
    /// Confirmed, awaiting pickup.
    PendingPickup,
    /// Registered (fulfilled).
    Finalized,
}

/// Order listing filter. All criteria are conjunctive.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub state: Option<StateFilter>,
    pub customer: Option<CustomerId>,
    pub date: Option<NaiveDate>,
}

impl OrderFilter {
    /// Filter for one lifecycle slice.
    pub fn state(state: StateFilter) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    /// Filter for one customer's orders.
    pub fn for_customer(customer: CustomerId) -> Self {
        Self {
            customer: Some(customer),
            ..Self::default()
        }
    }

    /// Restricts the filter to a single creation date.
    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Whether an order passes the filter.
    pub fn matches(&self, order: &Order) -> bool {
        let state_ok = match self.state {
            None => true,
            Some(StateFilter::Solicited) => order.status.is_solicited(),
            Some(StateFilter::PendingPickup) => order.status.is_pending_pickup(),
            Some(StateFilter::Finalized) => order.status.is_finalized(),
        };
        state_ok
            && self.customer.is_none_or(|c| order.customer == Some(c))
            && self.date.is_none_or(|d| order.date == d)
    }
}

/// Durable storage with unit-of-work semantics.
///
/// Contract: each method is one atomic unit. On any failure inside the
/// unit — validation, lock acquisition, storage fault — all writes
/// performed so far within it are discarded before the error is
/// surfaced, so readers never observe partial orders or half-applied
/// stock decrements. Stock mutation happens only through the
/// consumption planner, under exclusive per-product serialization.
#[async_trait]
pub trait Store: Send + Sync {
    // -- Catalog --

    /// Creates a product (always active). Fails with `NameConflict`
    /// if any product, active or not, already carries the name.
    async fn create_product(&self, new: NewProduct) -> Result<Product>;

    /// Loads a product by id.
    async fn product(&self, id: ProductId) -> Result<Product>;

    /// Lists products ordered by name.
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>>;

    /// Applies the supplied patch fields. Name collisions are checked
    /// against all products regardless of active state.
    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product>;

    /// Soft-deletes a product. Idempotent: deactivating an inactive
    /// product is a no-op, not an error.
    async fn deactivate_product(&self, id: ProductId) -> Result<Product>;

    // -- Orders --

    /// Creates an order from a validated request: resolves each cart
    /// line, snapshots prices, and persists header plus lines in one
    /// unit. Register-channel requests additionally commit stock
    /// consumption inside the same unit; online requests consume
    /// nothing at creation.
    async fn create_order(
        &self,
        request: OrderRequest,
        customer: Option<CustomerId>,
    ) -> Result<Order>;

    /// Loads an order with its lines.
    async fn order(&self, id: OrderId) -> Result<Order>;

    /// Lists orders matching the filter, oldest first.
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>>;

    /// Confirms an order. Idempotent.
    async fn confirm_order(&self, id: OrderId) -> Result<Order>;

    /// Registers (fulfills) an order: re-validates product activity
    /// and stock under exclusive locks, commits the consumption, and
    /// sets the flag — all in one unit. A second call is a no-op and
    /// decrements nothing. Fails with `NotConfirmed` when the order
    /// was never confirmed.
    async fn register_order(&self, id: OrderId) -> Result<Order>;

    /// Marks an order paid. Idempotent.
    async fn mark_paid(&self, id: OrderId) -> Result<Order>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use domain::{OrderChannel, OrderStatus};

    fn order_with_status(status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(),
            customer: Some(CustomerId::new()),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            observation: None,
            total_quantity: 1,
            status,
            payment_method: None,
            channel: OrderChannel::Online,
            lines: vec![],
        }
    }

    #[test]
    fn state_filter_slices_do_not_overlap() {
        let solicited = order_with_status(OrderStatus::requested());
        let mut confirmed_status = OrderStatus::requested();
        confirmed_status.confirm();
        let pending = order_with_status(confirmed_status);
        let finalized = order_with_status(OrderStatus::register_sale());

        assert!(OrderFilter::state(StateFilter::Solicited).matches(&solicited));
        assert!(!OrderFilter::state(StateFilter::Solicited).matches(&pending));
        assert!(OrderFilter::state(StateFilter::PendingPickup).matches(&pending));
        assert!(!OrderFilter::state(StateFilter::PendingPickup).matches(&finalized));
        assert!(OrderFilter::state(StateFilter::Finalized).matches(&finalized));
        assert!(!OrderFilter::state(StateFilter::Finalized).matches(&solicited));
    }

    #[test]
    fn customer_filter_excludes_register_sales() {
        let customer = CustomerId::new();
        let mut mine = order_with_status(OrderStatus::requested());
        mine.customer = Some(customer);
        let mut walk_in = order_with_status(OrderStatus::register_sale());
        walk_in.customer = None;

        let filter = OrderFilter::for_customer(customer);
        assert!(filter.matches(&mine));
        assert!(!filter.matches(&walk_in));
    }

    #[test]
    fn date_filter_matches_exact_day() {
        let order = order_with_status(OrderStatus::requested());
        let same = OrderFilter::default().on_date(order.date);
        let other =
            OrderFilter::default().on_date(NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert!(same.matches(&order));
        assert!(!other.matches(&order));
    }

    #[test]
    fn default_filter_matches_everything() {
        let order = order_with_status(OrderStatus::requested());
        assert!(OrderFilter::default().matches(&order));
    }
}

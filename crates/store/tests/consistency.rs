//! Consistency tests for the unit-of-work guarantees, run against the
//! in-memory backend through the `Store` trait.

use common::CustomerId;
use domain::{
    CartLine, InventoryError, Money, NewProduct, OrderChannel, OrderRequest, PaymentMethod,
};
use store::{InMemoryStore, Store, StoreError};

fn new_product(name: &str, stock: u32) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        price: Money::from_cents(1000),
        detail: None,
        photo: None,
        listed: true,
        stock,
        min_stock: 0,
    }
}

fn online(lines: Vec<CartLine>) -> OrderRequest {
    OrderRequest {
        lines,
        payment_method: None,
        observation: None,
        channel: OrderChannel::Online,
    }
}

fn register_sale(lines: Vec<CartLine>) -> OrderRequest {
    OrderRequest {
        lines,
        payment_method: Some(PaymentMethod::Cash),
        observation: None,
        channel: OrderChannel::Register,
    }
}

/// The full lifecycle walk: an online order holds no stock until it is
/// registered, registration decrements exactly once, and a later
/// register sale sees the decremented stock.
#[tokio::test]
async fn lifecycle_commits_stock_exactly_once() {
    let store = InMemoryStore::new();
    let p = store.create_product(new_product("Lasagna", 5)).await.unwrap();
    let cart = vec![CartLine {
        product_id: p.id,
        quantity: 3,
    }];

    let order = store
        .create_order(online(cart.clone()), Some(CustomerId::new()))
        .await
        .unwrap();
    assert_eq!(store.product(p.id).await.unwrap().stock, 5);

    store.confirm_order(order.id).await.unwrap();
    assert_eq!(store.product(p.id).await.unwrap().stock, 5);

    store.register_order(order.id).await.unwrap();
    assert_eq!(store.product(p.id).await.unwrap().stock, 2);

    // Registering again changes nothing.
    let again = store.register_order(order.id).await.unwrap();
    assert!(again.status.registered);
    assert_eq!(store.product(p.id).await.unwrap().stock, 2);

    // A register sale for 3 now exceeds the remaining 2.
    let err = store.create_order(register_sale(cart), None).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Inventory(InventoryError::InsufficientStock {
            requested: 3,
            available: 2,
            ..
        })
    ));
    assert_eq!(store.product(p.id).await.unwrap().stock, 2);
}

/// A failing line voids the whole batch: the passing line's stock must
/// not move either.
#[tokio::test]
async fn failed_batch_leaves_all_stock_untouched() {
    let store = InMemoryStore::new();
    let plenty = store.create_product(new_product("Ravioles", 10)).await.unwrap();
    let scarce = store.create_product(new_product("Flan", 1)).await.unwrap();

    let err = store
        .create_order(
            register_sale(vec![
                CartLine {
                    product_id: plenty.id,
                    quantity: 2,
                },
                CartLine {
                    product_id: scarce.id,
                    quantity: 5,
                },
            ]),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::Inventory(InventoryError::InsufficientStock { .. })
    ));
    assert_eq!(store.product(plenty.id).await.unwrap().stock, 10);
    assert_eq!(store.product(scarce.id).await.unwrap().stock, 1);
}

/// Concurrent register sales over one product: exactly `stock` of them
/// succeed and the final stock is zero, never negative.
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_register_sales_never_oversell() {
    let store = InMemoryStore::new();
    let p = store.create_product(new_product("Tarta", 10)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..25 {
        let store = store.clone();
        let product_id = p.id;
        handles.push(tokio::spawn(async move {
            store
                .create_order(
                    register_sale(vec![CartLine {
                        product_id,
                        quantity: 1,
                    }]),
                    None,
                )
                .await
        }));
    }

    let mut succeeded = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(StoreError::Inventory(InventoryError::InsufficientStock { .. })) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(rejected, 15);
    assert_eq!(store.product(p.id).await.unwrap().stock, 0);
}

/// Concurrent registration of the same order decrements exactly once.
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_registration_decrements_once() {
    let store = InMemoryStore::new();
    let p = store.create_product(new_product("Milanesa", 5)).await.unwrap();
    let order = store
        .create_order(
            online(vec![CartLine {
                product_id: p.id,
                quantity: 3,
            }]),
            Some(CustomerId::new()),
        )
        .await
        .unwrap();
    store.confirm_order(order.id).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let order_id = order.id;
        handles.push(tokio::spawn(
            async move { store.register_order(order_id).await },
        ));
    }
    for handle in handles {
        let registered = handle.await.unwrap().unwrap();
        assert!(registered.status.registered);
    }

    assert_eq!(store.product(p.id).await.unwrap().stock, 2);
}

/// Two online orders may together promise more than the stock; the
/// shortfall surfaces at registration time, and the failed one stays
/// unregistered.
#[tokio::test]
async fn overlapping_promises_resolve_at_registration() {
    let store = InMemoryStore::new();
    let p = store.create_product(new_product("Canelones", 5)).await.unwrap();
    let cart = vec![CartLine {
        product_id: p.id,
        quantity: 4,
    }];

    let first = store
        .create_order(online(cart.clone()), Some(CustomerId::new()))
        .await
        .unwrap();
    let second = store
        .create_order(online(cart), Some(CustomerId::new()))
        .await
        .unwrap();
    store.confirm_order(first.id).await.unwrap();
    store.confirm_order(second.id).await.unwrap();

    store.register_order(first.id).await.unwrap();
    let err = store.register_order(second.id).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Inventory(InventoryError::InsufficientStock {
            requested: 4,
            available: 1,
            ..
        })
    ));

    let unregistered = store.order(second.id).await.unwrap();
    assert!(!unregistered.status.registered);
    assert_eq!(store.product(p.id).await.unwrap().stock, 1);
}

//! OrderRepository contract tests.

use trailhead_storefront::domain::aggregates::{CartIdentity, OrderStatus, ProductPatch};
use trailhead_storefront::storage::{StorageError, Store};
use uuid::Uuid;

use super::{dec, guest, order_for, qty, seed_product};

// =============================================================================
// place_order
// =============================================================================

pub async fn test_place_order_writes_order_and_clears_cart<S: Store>(store: &S) {
    let product = seed_product(store, "Pedals", "50").await;
    let user_id = Uuid::now_v7();
    let cart = store.find_or_create_cart(&CartIdentity::User(user_id)).await.unwrap();
    store.add_item(cart.id, product.id, qty(4)).await.unwrap();
    let lines = store.cart_lines(cart.id).await.unwrap();

    let order = store.place_order(cart.id, &lines, order_for(Some(user_id), &lines)).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.subtotal, dec("200"));
    assert!(store.cart_lines(cart.id).await.unwrap().is_empty(), "cart is emptied with the order");

    let details = store.get_order(order.id).await.unwrap().expect("order should exist");
    assert_eq!(details.order.total, order.total);
    assert_eq!(details.order.shipping_address.city, "Boulder");
    assert_eq!(details.items.len(), 1);
    assert_eq!(details.items[0].item.quantity, 4);
    assert_eq!(details.items[0].item.price, dec("50"));
    assert_eq!(details.items[0].product.as_ref().map(|p| p.id), Some(product.id));
}

pub async fn test_stale_snapshot_writes_nothing<S: Store>(store: &S) {
    let product = seed_product(store, "Jersey", "89.99").await;
    let user_id = Uuid::now_v7();
    let cart = store.find_or_create_cart(&CartIdentity::User(user_id)).await.unwrap();
    store.add_item(cart.id, product.id, qty(1)).await.unwrap();
    let stale = store.cart_lines(cart.id).await.unwrap();
    store.add_item(cart.id, product.id, qty(1)).await.unwrap();

    let err = store.place_order(cart.id, &stale, order_for(Some(user_id), &stale)).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict { .. }), "got {err:?}");
    assert!(store.list_orders(Some(user_id)).await.unwrap().is_empty());
    assert_eq!(store.cart_lines(cart.id).await.unwrap()[0].item.quantity, 2, "cart is untouched");
}

pub async fn test_repriced_product_is_a_conflict<S: Store>(store: &S) {
    let product = seed_product(store, "Helmet", "149.99").await;
    let user_id = Uuid::now_v7();
    let cart = store.find_or_create_cart(&CartIdentity::User(user_id)).await.unwrap();
    store.add_item(cart.id, product.id, qty(1)).await.unwrap();
    let priced = store.cart_lines(cart.id).await.unwrap();

    let patch = ProductPatch { price: Some(dec("129.99")), ..Default::default() };
    store.update_product(product.id, patch).await.unwrap();

    let err = store.place_order(cart.id, &priced, order_for(Some(user_id), &priced)).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict { .. }), "got {err:?}");
    assert!(store.list_orders(Some(user_id)).await.unwrap().is_empty());

    let repriced = store.cart_lines(cart.id).await.unwrap();
    let order = store.place_order(cart.id, &repriced, order_for(Some(user_id), &repriced)).await.unwrap();
    assert_eq!(order.subtotal, dec("129.99"));
}

pub async fn test_deleted_product_leaves_order_snapshot<S: Store>(store: &S) {
    let product = seed_product(store, "Bike Lights", "79.99").await;
    let cart = store.find_or_create_cart(&guest()).await.unwrap();
    store.add_item(cart.id, product.id, qty(2)).await.unwrap();
    let lines = store.cart_lines(cart.id).await.unwrap();
    let order = store.place_order(cart.id, &lines, order_for(None, &lines)).await.unwrap();

    store.delete_product(product.id).await.unwrap();
    let details = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(details.items[0].item.price, dec("79.99"));
    assert!(details.items[0].product.is_none());
}

// =============================================================================
// Listing
// =============================================================================

pub async fn test_list_orders_scoped_newest_first<S: Store>(store: &S) {
    let product = seed_product(store, "Gloves", "39.99").await;
    let user_id = Uuid::now_v7();
    let cart = store.find_or_create_cart(&CartIdentity::User(user_id)).await.unwrap();

    let mut placed = Vec::new();
    for _ in 0..2 {
        store.add_item(cart.id, product.id, qty(1)).await.unwrap();
        let lines = store.cart_lines(cart.id).await.unwrap();
        placed.push(store.place_order(cart.id, &lines, order_for(Some(user_id), &lines)).await.unwrap().id);
    }

    let mine: Vec<Uuid> = store.list_orders(Some(user_id)).await.unwrap().into_iter().map(|o| o.id).collect();
    assert_eq!(mine, vec![placed[1], placed[0]]);
    assert!(store.list_orders(Some(Uuid::now_v7())).await.unwrap().is_empty());

    let all = store.list_orders(None).await.unwrap();
    assert!(placed.iter().all(|id| all.iter().any(|o| o.id == *id)));
}

// =============================================================================
// update_order_status
// =============================================================================

async fn pending_order<S: Store>(store: &S) -> Uuid {
    let product = seed_product(store, "Saddle", "60").await;
    let cart = store.find_or_create_cart(&guest()).await.unwrap();
    store.add_item(cart.id, product.id, qty(1)).await.unwrap();
    let lines = store.cart_lines(cart.id).await.unwrap();
    store.place_order(cart.id, &lines, order_for(None, &lines)).await.unwrap().id
}

pub async fn test_status_compare_and_set<S: Store>(store: &S) {
    let id = pending_order(store).await;

    let processing = store.update_order_status(id, OrderStatus::Pending, OrderStatus::Processing).await.unwrap();
    assert_eq!(processing.map(|o| o.status), Some(OrderStatus::Processing));

    let err = store.update_order_status(id, OrderStatus::Pending, OrderStatus::Cancelled).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict { .. }), "got {err:?}");
    let current = store.get_order(id).await.unwrap().unwrap().order;
    assert_eq!(current.status, OrderStatus::Processing);

    let missing = store.update_order_status(Uuid::now_v7(), OrderStatus::Pending, OrderStatus::Processing).await;
    assert!(missing.unwrap().is_none());
}

pub async fn test_concurrent_status_updates_one_wins<S: Store>(store: &S) {
    let id = pending_order(store).await;

    let (a, b) = tokio::join!(
        store.update_order_status(id, OrderStatus::Pending, OrderStatus::Processing),
        store.update_order_status(id, OrderStatus::Pending, OrderStatus::Cancelled),
    );
    let outcomes = [a, b];
    let winners = outcomes.iter().filter(|r| matches!(r, Ok(Some(_)))).count();
    let losers = outcomes.iter().filter(|r| matches!(r, Err(StorageError::Conflict { .. }))).count();
    assert_eq!((winners, losers), (1, 1));
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all OrderRepository contract tests against a store.
#[macro_export]
macro_rules! run_order_store_tests {
    ($store:expr) => {
        use $crate::storage::order_store_tests::*;

        test_place_order_writes_order_and_clears_cart($store).await;
        println!("  test_place_order_writes_order_and_clears_cart: PASSED");

        test_stale_snapshot_writes_nothing($store).await;
        println!("  test_stale_snapshot_writes_nothing: PASSED");

        test_repriced_product_is_a_conflict($store).await;
        println!("  test_repriced_product_is_a_conflict: PASSED");

        test_deleted_product_leaves_order_snapshot($store).await;
        println!("  test_deleted_product_leaves_order_snapshot: PASSED");

        test_list_orders_scoped_newest_first($store).await;
        println!("  test_list_orders_scoped_newest_first: PASSED");

        test_status_compare_and_set($store).await;
        println!("  test_status_compare_and_set: PASSED");

        test_concurrent_status_updates_one_wins($store).await;
        println!("  test_concurrent_status_updates_one_wins: PASSED");
    };
}

//! CartRepository contract tests.

use trailhead_storefront::domain::aggregates::CartIdentity;
use trailhead_storefront::storage::{StorageError, Store};
use uuid::Uuid;

use super::{guest, qty, seed_product};

// =============================================================================
// find_or_create_cart
// =============================================================================

pub async fn test_find_or_create_is_idempotent<S: Store>(store: &S) {
    let identity = guest();
    let a = store.find_or_create_cart(&identity).await.unwrap();
    let b = store.find_or_create_cart(&identity).await.unwrap();
    assert_eq!(a.id, b.id, "same identity should get the same cart");

    let user = store.find_or_create_cart(&CartIdentity::User(Uuid::now_v7())).await.unwrap();
    assert_ne!(a.id, user.id);
    assert!(user.session_id.is_none());
}

pub async fn test_concurrent_find_or_create_returns_one_cart<S: Store>(store: &S) {
    let identity = guest();
    let (a, b) = tokio::join!(store.find_or_create_cart(&identity), store.find_or_create_cart(&identity));
    assert_eq!(a.unwrap().id, b.unwrap().id, "racing requests must share one cart");
}

// =============================================================================
// add_item
// =============================================================================

pub async fn test_concurrent_adds_on_new_identity_merge<S: Store>(store: &S) {
    let product = seed_product(store, "Bike Lights", "79.99").await;
    let identity = &guest();
    let product_id = product.id;
    let add_one = || async move {
        let cart = store.find_or_create_cart(identity).await?;
        store.add_item(cart.id, product_id, qty(1)).await
    };

    let (a, b) = tokio::join!(add_one(), add_one());
    assert!(a.unwrap().is_some());
    assert!(b.unwrap().is_some());

    let cart = store.find_or_create_cart(identity).await.unwrap();
    let lines = store.cart_lines(cart.id).await.unwrap();
    assert_eq!(lines.len(), 1, "one line per product");
    assert_eq!(lines[0].item.quantity, 2);
}

pub async fn test_merge_past_max_is_refused<S: Store>(store: &S) {
    let product = seed_product(store, "Pedals", "119.99").await;
    let cart = store.find_or_create_cart(&guest()).await.unwrap();

    let first = store.add_item(cart.id, product.id, qty(2)).await.unwrap().unwrap();
    let merged = store.add_item(cart.id, product.id, qty(3)).await.unwrap().unwrap();
    assert_eq!(first.id, merged.id);
    assert_eq!(merged.quantity, 5);

    assert!(store.add_item(cart.id, product.id, qty(995)).await.unwrap().is_none());
    assert_eq!(store.cart_lines(cart.id).await.unwrap()[0].item.quantity, 5, "refused merge leaves the line");

    let full = store.add_item(cart.id, product.id, qty(994)).await.unwrap().unwrap();
    assert_eq!(full.quantity, 999);
}

pub async fn test_add_unknown_product_fails<S: Store>(store: &S) {
    let cart = store.find_or_create_cart(&guest()).await.unwrap();
    let err = store.add_item(cart.id, Uuid::now_v7(), qty(1)).await.unwrap_err();
    assert!(matches!(err, StorageError::ForeignKeyViolation { .. }), "got {err:?}");
    assert!(store.cart_lines(cart.id).await.unwrap().is_empty());
}

// =============================================================================
// Updates, removal and clearing
// =============================================================================

pub async fn test_item_ops_scoped_to_cart<S: Store>(store: &S) {
    let product = seed_product(store, "Jersey", "89.99").await;
    let mine = store.find_or_create_cart(&guest()).await.unwrap();
    let theirs = store.find_or_create_cart(&guest()).await.unwrap();
    let item = store.add_item(theirs.id, product.id, qty(1)).await.unwrap().unwrap();

    assert!(store.set_item_quantity(mine.id, item.id, qty(4)).await.unwrap().is_none());
    assert!(!store.remove_item(mine.id, item.id).await.unwrap());

    let updated = store.set_item_quantity(theirs.id, item.id, qty(4)).await.unwrap().unwrap();
    assert_eq!(updated.quantity, 4);
    assert!(store.remove_item(theirs.id, item.id).await.unwrap());
    assert!(store.cart_lines(theirs.id).await.unwrap().is_empty());
}

pub async fn test_clear_cart<S: Store>(store: &S) {
    let lights = seed_product(store, "Bike Lights", "79.99").await;
    let pedals = seed_product(store, "Pedals", "119.99").await;
    let cart = store.find_or_create_cart(&guest()).await.unwrap();
    store.add_item(cart.id, lights.id, qty(1)).await.unwrap();
    store.add_item(cart.id, pedals.id, qty(2)).await.unwrap();

    assert_eq!(store.clear_cart(cart.id).await.unwrap(), 2);
    assert_eq!(store.clear_cart(cart.id).await.unwrap(), 0);
    assert!(store.cart_lines(cart.id).await.unwrap().is_empty());
}

pub async fn test_delete_product_purges_carts<S: Store>(store: &S) {
    let product = seed_product(store, "Helmet", "149.99").await;
    let cart = store.find_or_create_cart(&guest()).await.unwrap();
    store.add_item(cart.id, product.id, qty(1)).await.unwrap();

    assert!(store.delete_product(product.id).await.unwrap());
    assert!(store.cart_lines(cart.id).await.unwrap().is_empty());
    assert!(store.delete_category(product.category_id).await.unwrap());
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all CartRepository contract tests against a store.
#[macro_export]
macro_rules! run_cart_store_tests {
    ($store:expr) => {
        use $crate::storage::cart_store_tests::*;

        test_find_or_create_is_idempotent($store).await;
        println!("  test_find_or_create_is_idempotent: PASSED");

        test_concurrent_find_or_create_returns_one_cart($store).await;
        println!("  test_concurrent_find_or_create_returns_one_cart: PASSED");

        test_concurrent_adds_on_new_identity_merge($store).await;
        println!("  test_concurrent_adds_on_new_identity_merge: PASSED");

        test_merge_past_max_is_refused($store).await;
        println!("  test_merge_past_max_is_refused: PASSED");

        test_add_unknown_product_fails($store).await;
        println!("  test_add_unknown_product_fails: PASSED");

        test_item_ops_scoped_to_cart($store).await;
        println!("  test_item_ops_scoped_to_cart: PASSED");

        test_clear_cart($store).await;
        println!("  test_clear_cart: PASSED");

        test_delete_product_purges_carts($store).await;
        println!("  test_delete_product_purges_carts: PASSED");
    };
}

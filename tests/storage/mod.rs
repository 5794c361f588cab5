//! Storage contract tests.
//!
//! Every backing store must pass these. Each backend's test binary builds a
//! store and hands it to the functions in the submodules. Fixtures use fresh
//! slugs and identities, so one database can serve every test.

#![allow(dead_code)]

pub mod cart_store_tests;
pub mod order_store_tests;

use rust_decimal::Decimal;
use uuid::Uuid;

use trailhead_storefront::domain::aggregates::{
    Address, CartIdentity, CartLine, NewCategory, NewOrder, NewOrderItem, NewProduct, Product,
};
use trailhead_storefront::domain::pricing;
use trailhead_storefront::domain::value_objects::{Quantity, Slug};
use trailhead_storefront::storage::Store;

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn qty(n: i64) -> Quantity {
    Quantity::new(n).unwrap()
}

/// A new anonymous shopper.
pub fn guest() -> CartIdentity {
    CartIdentity::Session(CartIdentity::new_session_token())
}

/// A product in its own category.
pub async fn seed_product<S: Store>(store: &S, name: &str, price: &str) -> Product {
    let tag = suffix();
    let category = store
        .insert_category(NewCategory {
            name: format!("Accessories {tag}"),
            slug: Slug::new(&format!("accessories-{tag}")).unwrap(),
            description: None,
            image_url: None,
        })
        .await
        .expect("insert category");
    store
        .insert_product(NewProduct {
            name: name.into(),
            slug: Slug::new(&format!("{}-{tag}", Slug::from_name(name).unwrap().as_str())).unwrap(),
            description: None,
            price: dec(price),
            compare_at_price: None,
            image_url: None,
            category_id: category.id,
            brand: None,
            in_stock: true,
            is_featured: false,
            is_new: false,
        })
        .await
        .expect("insert product")
}

pub fn address() -> Address {
    Address {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        address1: "1 Trail Way".into(),
        address2: None,
        city: "Boulder".into(),
        state: "CO".into(),
        postal_code: "80302".into(),
        country: "US".into(),
        phone: None,
    }
}

/// An order priced from `lines`, as checkout would build it.
pub fn order_for(user_id: Option<Uuid>, lines: &[CartLine]) -> NewOrder {
    let quote = pricing::quote(lines.iter().map(|l| (l.unit_price(), l.item.quantity)), None);
    NewOrder {
        user_id,
        promo_code: None,
        quote,
        shipping_address: address(),
        billing_address: address(),
        payment_method: "credit_card".into(),
        items: lines
            .iter()
            .map(|l| NewOrderItem { product_id: l.product.id, quantity: l.item.quantity, price: l.unit_price() })
            .collect(),
    }
}

//! Storefront domain: catalog, carts, orders and the pricing rules between them.
pub mod aggregates;
pub mod events;
pub mod identity;
pub mod pricing;
pub mod value_objects;

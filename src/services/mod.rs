//! Application services. Each one owns a handle on the store and is cheap to clone.
pub mod cart;
pub mod catalog;
pub mod orders;

pub use cart::{CartService, CartView};
pub use catalog::CatalogService;
pub use orders::{CheckoutRequest, OrderService};

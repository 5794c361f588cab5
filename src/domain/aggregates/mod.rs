//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{Category, CategoryPatch, NewCategory, NewProduct, Product, ProductPage, ProductPatch, ProductQuery, ProductSort};
pub use order::{Address, NewOrder, NewOrderItem, Order, OrderDetails, OrderError, OrderItem, OrderLine, OrderStatus};
pub use cart::{Cart, CartContents, CartIdentity, CartItem, CartLine};

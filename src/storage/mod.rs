//! Storage ports.
//!
//! The services only see these traits. Each adapter must make the following
//! atomic on its own: cart find-or-create per identity, merge-on-add and
//! quantity updates per cart, and order placement together with clearing the
//! source cart.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{
    Cart, CartIdentity, CartItem, CartLine, Category, CategoryPatch, NewCategory, NewOrder, NewProduct, Order,
    OrderDetails, OrderStatus, Product, ProductPage, ProductPatch, ProductQuery,
};
use crate::domain::value_objects::Quantity;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The row changed between read and write; the caller may retry.
    #[error("concurrent modification of {entity}")]
    Conflict { entity: &'static str },

    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("row is still referenced: {constraint}")]
    ForeignKeyViolation { constraint: String },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StorageError>;
    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StorageError>;
    async fn insert_category(&self, category: NewCategory) -> Result<Category, StorageError>;
    async fn update_category(&self, id: Uuid, patch: CategoryPatch) -> Result<Option<Category>, StorageError>;
    /// Fails with [`StorageError::ForeignKeyViolation`] while products reference it.
    async fn delete_category(&self, id: Uuid) -> Result<bool, StorageError>;

    async fn query_products(&self, query: &ProductQuery) -> Result<ProductPage, StorageError>;
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StorageError>;
    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>, StorageError>;
    async fn insert_product(&self, product: NewProduct) -> Result<Product, StorageError>;
    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> Result<Option<Product>, StorageError>;
    /// Also drops the product from every cart. Order items are left alone.
    async fn delete_product(&self, id: Uuid) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Return the identity's cart, creating it if none exists. Concurrent
    /// callers with the same identity always get the same cart.
    async fn find_or_create_cart(&self, identity: &CartIdentity) -> Result<Cart, StorageError>;

    /// Items joined with their live products, oldest first.
    async fn cart_lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>, StorageError>;

    /// Insert the product or add to its existing quantity. Returns `None` when
    /// the merged quantity would pass [`Quantity::MAX`]; nothing is written then.
    async fn add_item(&self, cart_id: Uuid, product_id: Uuid, quantity: Quantity) -> Result<Option<CartItem>, StorageError>;

    /// `None` when the item does not exist in this cart.
    async fn set_item_quantity(&self, cart_id: Uuid, item_id: Uuid, quantity: Quantity) -> Result<Option<CartItem>, StorageError>;

    async fn remove_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<bool, StorageError>;

    /// Returns the number of items removed.
    async fn clear_cart(&self, cart_id: Uuid) -> Result<u64, StorageError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Write the order and its items and empty the cart, all or nothing.
    ///
    /// `expected` is the cart content the order was priced from. If the cart
    /// no longer holds exactly those items, or a product's price has changed
    /// since, nothing is written and [`StorageError::Conflict`] is returned.
    async fn place_order(&self, cart_id: Uuid, expected: &[CartLine], order: NewOrder) -> Result<Order, StorageError>;

    async fn get_order(&self, id: Uuid) -> Result<Option<OrderDetails>, StorageError>;

    /// Newest first. `None` lists every order.
    async fn list_orders(&self, user_id: Option<Uuid>) -> Result<Vec<Order>, StorageError>;

    /// Compare-and-set on the status column. `None` if the order does not
    /// exist, [`StorageError::Conflict`] if its status is no longer `from`.
    async fn update_order_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<Option<Order>, StorageError>;
}

/// Everything the storefront needs from a backing store.
pub trait Store: CatalogRepository + CartRepository + OrderRepository {}

impl<T: CatalogRepository + CartRepository + OrderRepository> Store for T {}

//! In-process store.
//!
//! All tables sit behind one `RwLock`, so every trait method runs as a single
//! critical section. That is what gives find-or-create, merge-on-add and order
//! placement their atomicity here.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CartRepository, CatalogRepository, OrderRepository, StorageError};
use crate::domain::aggregates::cart::same_lines;
use crate::domain::aggregates::{
    Cart, CartIdentity, CartItem, CartLine, Category, CategoryPatch, NewCategory, NewOrder, NewProduct, Order,
    OrderDetails, OrderItem, OrderLine, OrderStatus, Product, ProductPage, ProductPatch, ProductQuery,
};
use crate::domain::value_objects::Quantity;

#[derive(Default)]
struct Tables {
    categories: HashMap<Uuid, Category>,
    products: HashMap<Uuid, Product>,
    carts: Vec<Cart>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
}

impl Tables {
    fn slug_taken<'a>(mut slugs: impl Iterator<Item = (&'a Uuid, &'a str)>, slug: &str, except: Option<Uuid>) -> bool {
        slugs.any(|(id, s)| s == slug && Some(*id) != except)
    }

    fn category_slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        Self::slug_taken(self.categories.iter().map(|(id, c)| (id, c.slug.as_str())), slug, except)
    }

    fn product_slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        Self::slug_taken(self.products.iter().map(|(id, p)| (id, p.slug.as_str())), slug, except)
    }

    fn lines_of(&self, cart_id: Uuid) -> Vec<CartLine> {
        self.cart_items.iter()
            .filter(|i| i.cart_id == cart_id)
            .filter_map(|i| self.products.get(&i.product_id).map(|p| CartLine { item: i.clone(), product: p.clone() }))
            .collect()
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }
}

fn unique(constraint: &str) -> StorageError {
    StorageError::UniqueViolation { constraint: constraint.to_string() }
}

fn foreign_key(constraint: &str) -> StorageError {
    StorageError::ForeignKeyViolation { constraint: constraint.to_string() }
}

#[async_trait]
impl CatalogRepository for MemoryStorage {
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StorageError> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StorageError> {
        Ok(self.tables.read().await.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.category_slug_taken(category.slug.as_str(), None) { return Err(unique("categories_slug_key")); }
        let category = category.into_category();
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: Uuid, patch: CategoryPatch) -> Result<Option<Category>, StorageError> {
        let mut tables = self.tables.write().await;
        if let Some(slug) = &patch.slug {
            if tables.category_slug_taken(slug.as_str(), Some(id)) { return Err(unique("categories_slug_key")); }
        }
        Ok(tables.categories.get_mut(&id).map(|category| {
            patch.apply(category);
            category.clone()
        }))
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.products.values().any(|p| p.category_id == id) { return Err(foreign_key("products_category_id_fkey")); }
        Ok(tables.categories.remove(&id).is_some())
    }

    async fn query_products(&self, query: &ProductQuery) -> Result<ProductPage, StorageError> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables.products.values().filter(|p| query.matches(p)).cloned().collect();
        products.sort_by(|a, b| query.sort.compare(a, b).then_with(|| a.id.cmp(&b.id)));
        let total = products.len() as u64;
        let products = products.into_iter().skip(query.offset as usize).take(query.limit as usize).collect();
        Ok(ProductPage { products, total })
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StorageError> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>, StorageError> {
        Ok(self.tables.read().await.products.values().find(|p| p.slug == slug).cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.product_slug_taken(product.slug.as_str(), None) { return Err(unique("products_slug_key")); }
        if !tables.categories.contains_key(&product.category_id) { return Err(foreign_key("products_category_id_fkey")); }
        let product = product.into_product();
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> Result<Option<Product>, StorageError> {
        let mut tables = self.tables.write().await;
        if let Some(slug) = &patch.slug {
            if tables.product_slug_taken(slug.as_str(), Some(id)) { return Err(unique("products_slug_key")); }
        }
        if let Some(category_id) = patch.category_id {
            if !tables.categories.contains_key(&category_id) { return Err(foreign_key("products_category_id_fkey")); }
        }
        Ok(tables.products.get_mut(&id).map(|product| {
            patch.apply(product);
            product.clone()
        }))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        let removed = tables.products.remove(&id).is_some();
        if removed { tables.cart_items.retain(|i| i.product_id != id); }
        Ok(removed)
    }
}

#[async_trait]
impl CartRepository for MemoryStorage {
    async fn find_or_create_cart(&self, identity: &CartIdentity) -> Result<Cart, StorageError> {
        if let Some(cart) = self.tables.read().await.carts.iter().find(|c| c.belongs_to(identity)) {
            return Ok(cart.clone());
        }
        let mut tables = self.tables.write().await;
        // Another request may have created it between the two locks.
        if let Some(cart) = tables.carts.iter().find(|c| c.belongs_to(identity)) {
            return Ok(cart.clone());
        }
        let cart = Cart::for_identity(identity);
        tables.carts.push(cart.clone());
        Ok(cart)
    }

    async fn cart_lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>, StorageError> {
        Ok(self.tables.read().await.lines_of(cart_id))
    }

    async fn add_item(&self, cart_id: Uuid, product_id: Uuid, quantity: Quantity) -> Result<Option<CartItem>, StorageError> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&product_id) { return Err(foreign_key("cart_items_product_id_fkey")); }
        if let Some(existing) = tables.cart_items.iter_mut().find(|i| i.cart_id == cart_id && i.product_id == product_id) {
            let current = Quantity::new(i64::from(existing.quantity)).map_err(|e| StorageError::Backend(e.to_string()))?;
            return Ok(current.checked_add(quantity).ok().map(|merged| {
                existing.quantity = merged.value();
                existing.clone()
            }));
        }
        let item = CartItem { id: Uuid::now_v7(), cart_id, product_id, quantity: quantity.value() };
        tables.cart_items.push(item.clone());
        Ok(Some(item))
    }

    async fn set_item_quantity(&self, cart_id: Uuid, item_id: Uuid, quantity: Quantity) -> Result<Option<CartItem>, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(tables.cart_items.iter_mut().find(|i| i.id == item_id && i.cart_id == cart_id).map(|item| {
            item.quantity = quantity.value();
            item.clone()
        }))
    }

    async fn remove_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        let before = tables.cart_items.len();
        tables.cart_items.retain(|i| !(i.id == item_id && i.cart_id == cart_id));
        Ok(tables.cart_items.len() != before)
    }

    async fn clear_cart(&self, cart_id: Uuid) -> Result<u64, StorageError> {
        let mut tables = self.tables.write().await;
        let before = tables.cart_items.len();
        tables.cart_items.retain(|i| i.cart_id != cart_id);
        Ok((before - tables.cart_items.len()) as u64)
    }
}

#[async_trait]
impl OrderRepository for MemoryStorage {
    async fn place_order(&self, cart_id: Uuid, expected: &[CartLine], order: NewOrder) -> Result<Order, StorageError> {
        let mut tables = self.tables.write().await;
        if !same_lines(&tables.lines_of(cart_id), expected) {
            return Err(StorageError::Conflict { entity: "cart" });
        }
        let (order, items) = order.into_records();
        tables.orders.push(order.clone());
        tables.order_items.extend(items);
        tables.cart_items.retain(|i| i.cart_id != cart_id);
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<OrderDetails>, StorageError> {
        let tables = self.tables.read().await;
        let Some(order) = tables.orders.iter().find(|o| o.id == id).cloned() else { return Ok(None) };
        let items = tables.order_items.iter()
            .filter(|i| i.order_id == id)
            .map(|i| OrderLine { item: i.clone(), product: tables.products.get(&i.product_id).cloned() })
            .collect();
        Ok(Some(OrderDetails { order, items }))
    }

    async fn list_orders(&self, user_id: Option<Uuid>) -> Result<Vec<Order>, StorageError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables.orders.iter()
            .filter(|o| user_id.is_none() || o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn update_order_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<Option<Order>, StorageError> {
        let mut tables = self.tables.write().await;
        let Some(order) = tables.orders.iter_mut().find(|o| o.id == id) else { return Ok(None) };
        if order.status != from { return Err(StorageError::Conflict { entity: "order" }); }
        order.status = to;
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }
}

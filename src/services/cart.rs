//! Cart service: identity resolution, line items and the priced view.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{CartContents, CartIdentity, CartItem, CartLine};
use crate::domain::pricing::{self, PriceQuote};
use crate::domain::value_objects::Quantity;
use crate::storage::{StorageError, Store};
use crate::{Result, StorefrontError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 { 1 }

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    #[serde(flatten)]
    pub quote: PriceQuote,
    pub item_count: u32,
    pub free_shipping: bool,
}

/// What `GET /api/cart` returns.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_id: Uuid,
    pub items: Vec<CartLine>,
    pub summary: CartSummary,
}

impl CartView {
    pub fn new(contents: CartContents, promo_code: Option<&str>) -> Self {
        let quote = pricing::quote(contents.priced_lines(), promo_code);
        let summary = CartSummary { free_shipping: quote.is_free_shipping(), item_count: contents.item_count(), quote };
        Self { cart_id: contents.cart.id, items: contents.lines, summary }
    }
}

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    /// The identity's cart with its current lines, created empty if needed.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, identity: &CartIdentity) -> Result<CartContents> {
        let cart = self.store.find_or_create_cart(identity).await?;
        let lines = self.store.cart_lines(cart.id).await?;
        Ok(CartContents { cart, lines })
    }

    /// Cart contents priced with the optional promo code. An unknown code is
    /// reported in the summary rather than failing.
    pub async fn view(&self, identity: &CartIdentity, promo_code: Option<&str>) -> Result<CartView> {
        Ok(CartView::new(self.resolve(identity).await?, promo_code))
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, identity: &CartIdentity, product_id: Uuid, quantity: i64) -> Result<CartItem> {
        let quantity = Quantity::new(quantity)?;
        let product = self.store.get_product(product_id).await?.ok_or(StorefrontError::NotFound("Product"))?;
        if !product.in_stock {
            return Err(StorefrontError::invalid("productId", format!("{} is out of stock", product.name)));
        }

        let cart = self.store.find_or_create_cart(identity).await?;
        match self.store.add_item(cart.id, product_id, quantity).await {
            Ok(Some(item)) => Ok(item),
            Ok(None) => Err(StorefrontError::invalid("quantity", format!("a cart line may hold at most {} units", Quantity::MAX))),
            Err(StorageError::ForeignKeyViolation { .. }) => Err(StorefrontError::NotFound("Product")),
            Err(e) => Err(e.into()),
        }
    }

    /// Set an item's quantity. Zero or less removes it and returns `None`.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(&self, identity: &CartIdentity, item_id: Uuid, quantity: i64) -> Result<Option<CartItem>> {
        let cart = self.store.find_or_create_cart(identity).await?;
        if quantity <= 0 {
            return if self.store.remove_item(cart.id, item_id).await? {
                Ok(None)
            } else {
                Err(StorefrontError::NotFound("Cart item"))
            };
        }
        let quantity = Quantity::new(quantity)?;
        self.store.set_item_quantity(cart.id, item_id, quantity).await?
            .map(Some)
            .ok_or(StorefrontError::NotFound("Cart item"))
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, identity: &CartIdentity, item_id: Uuid) -> Result<()> {
        let cart = self.store.find_or_create_cart(identity).await?;
        if self.store.remove_item(cart.id, item_id).await? {
            Ok(())
        } else {
            Err(StorefrontError::NotFound("Cart item"))
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, identity: &CartIdentity) -> Result<()> {
        let cart = self.store.find_or_create_cart(identity).await?;
        let removed = self.store.clear_cart(cart.id).await?;
        tracing::debug!(cart_id = %cart.id, removed, "cart cleared");
        Ok(())
    }
}

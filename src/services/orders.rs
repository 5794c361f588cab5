//! Checkout and order administration.

use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Address, CartContents, NewOrder, NewOrderItem, Order, OrderDetails, OrderError, OrderStatus};
use crate::domain::events::OrderEvent;
use crate::domain::identity::{SessionUser, Shopper};
use crate::domain::pricing::{self, find_promo};
use crate::publisher::EventPublisher;
use crate::storage::{StorageError, Store};
use crate::{FieldErrors, Result, StorefrontError};

pub const DEFAULT_PAYMENT_METHOD: &str = "credit_card";

/// Attempts at converting a cart that keeps changing underneath checkout.
const PLACE_ORDER_ATTEMPTS: u32 = 3;

/// Body of `POST /api/orders`. Totals are never accepted from the client.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub payment_method: Option<String>,
    pub promo_code: Option<String>,
    pub total: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

struct Checkout {
    shipping_address: Address,
    billing_address: Address,
    payment_method: String,
    promo_code: Option<String>,
}

fn checked_address(address: Option<Address>, field: &str, label: &str, errors: &mut FieldErrors) -> Option<Address> {
    let Some(address) = address else {
        errors.push(field, format!("{label} is required"));
        return None;
    };
    let address = address.normalized();
    if let Err(e) = address.validate() {
        errors.extend_from_validator(field, &e);
    }
    Some(address)
}

impl CheckoutRequest {
    fn into_checkout(self) -> Result<Checkout> {
        let mut errors = FieldErrors::default();
        let shipping = checked_address(self.shipping_address, "shippingAddress", "Shipping address", &mut errors);
        let billing = checked_address(self.billing_address, "billingAddress", "Billing address", &mut errors);

        if self.total.is_some() {
            errors.push("total", "Order total is calculated by the server and must not be sent");
        }
        let promo_code = self.promo_code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        if let Some(code) = &promo_code {
            if find_promo(code).is_none() {
                errors.push("promoCode", format!("Promo code '{code}' is not valid"));
            }
        }
        let payment_method = self.payment_method
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string());

        match (shipping, billing) {
            (Some(shipping_address), Some(billing_address)) if errors.is_empty() => {
                Ok(Checkout { shipping_address, billing_address, payment_method, promo_code })
            }
            _ => Err(StorefrontError::Validation(errors)),
        }
    }
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    events: EventPublisher,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, events: EventPublisher) -> Self { Self { store, events } }

    /// Turn the shopper's cart into a pending order and empty the cart.
    ///
    /// Pricing is recomputed from the live product prices; each order item
    /// keeps the unit price it was bought at. If the cart changes while the
    /// order is being written, the cart is re-read and priced again.
    #[tracing::instrument(skip(self, request), fields(user_id = ?shopper.user_id()))]
    pub async fn place_order(&self, shopper: &Shopper, request: CheckoutRequest) -> Result<Order> {
        let cart = self.store.find_or_create_cart(&shopper.cart).await?;
        let mut lines = self.store.cart_lines(cart.id).await?;
        if lines.is_empty() {
            return Err(StorefrontError::EmptyCart);
        }
        let checkout = request.into_checkout()?;

        let mut attempt = 1;
        loop {
            let contents = CartContents { cart: cart.clone(), lines };
            let quote = pricing::quote(contents.priced_lines(), checkout.promo_code.as_deref());
            let items: Vec<NewOrderItem> = contents.lines.iter()
                .map(|l| NewOrderItem { product_id: l.product.id, quantity: l.item.quantity, price: l.unit_price() })
                .collect();
            let item_count = items.len();
            let order = NewOrder {
                user_id: shopper.user_id(),
                promo_code: quote.applied_promo_code().map(str::to_string),
                quote,
                shipping_address: checkout.shipping_address.clone(),
                billing_address: checkout.billing_address.clone(),
                payment_method: checkout.payment_method.clone(),
                items,
            };

            match self.store.place_order(cart.id, &contents.lines, order).await {
                Ok(order) => {
                    tracing::info!(order_id = %order.id, total = %order.total, "order placed");
                    self.events.publish(OrderEvent::Placed {
                        order_id: order.id, user_id: order.user_id, total: order.total, item_count,
                    }).await;
                    return Ok(order);
                }
                Err(StorageError::Conflict { .. }) if attempt < PLACE_ORDER_ATTEMPTS => {
                    tracing::warn!(attempt, cart_id = %cart.id, "cart changed during checkout, retrying");
                    attempt += 1;
                    lines = self.store.cart_lines(cart.id).await?;
                    if lines.is_empty() {
                        return Err(StorefrontError::EmptyCart);
                    }
                }
                Err(StorageError::Conflict { .. }) => {
                    return Err(StorefrontError::Conflict("Cart kept changing during checkout; please try again".into()));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Anonymous viewers get `Unauthenticated`; other users' orders are `Forbidden`.
    #[tracing::instrument(skip(self, viewer))]
    pub async fn get_order(&self, viewer: Option<&SessionUser>, id: Uuid) -> Result<OrderDetails> {
        let viewer = viewer.ok_or(StorefrontError::Unauthenticated)?;
        let details = self.store.get_order(id).await?.ok_or(StorefrontError::NotFound("Order"))?;
        if !details.order.is_visible_to(viewer) {
            return Err(StorefrontError::Forbidden("Unauthorized access to order".into()));
        }
        Ok(details)
    }

    pub async fn list_for_user(&self, user: &SessionUser) -> Result<Vec<Order>> {
        Ok(self.store.list_orders(Some(user.id)).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Order>> {
        Ok(self.store.list_orders(None).await?)
    }

    /// Move an order one step through its workflow. Re-applying the current
    /// status is accepted and changes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, id: Uuid, status: &str) -> Result<Order> {
        let next: OrderStatus = status.parse()?;
        let current = self.store.get_order(id).await?.ok_or(StorefrontError::NotFound("Order"))?.order;
        if current.status == next {
            return Ok(current);
        }
        if !current.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { from: current.status, to: next }.into());
        }

        match self.store.update_order_status(id, current.status, next).await {
            Ok(Some(order)) => {
                self.events.publish(OrderEvent::StatusChanged { order_id: id, from: current.status, to: next }).await;
                Ok(order)
            }
            Ok(None) => Err(StorefrontError::NotFound("Order")),
            Err(StorageError::Conflict { .. }) => {
                Err(StorefrontError::Conflict("Order status was changed by another request".into()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

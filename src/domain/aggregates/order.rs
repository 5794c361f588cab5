//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::product::Product;
use crate::domain::identity::SessionUser;
use crate::domain::pricing::PriceQuote;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Single-step moves: pending -> processing -> completed, and
    /// pending|processing -> cancelled.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Pending | Self::Processing, Self::Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(OrderError::UnknownStatus(s.to_string())),
        }
    }
}

/// Postal address snapshot. Stored by value on the order so later edits to a
/// customer's address book never rewrite history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "Postal code is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, message = "Country is required"))]
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Address {
    /// Trim every field and drop blank optionals.
    pub fn normalized(self) -> Self {
        let trim = |s: String| s.trim().to_string();
        let trim_opt = |s: Option<String>| s.map(trim).filter(|s| !s.is_empty());
        Self {
            first_name: trim(self.first_name),
            last_name: trim(self.last_name),
            address1: trim(self.address1),
            address2: trim_opt(self.address2),
            city: trim(self.city),
            state: trim(self.state),
            postal_code: trim(self.postal_code),
            country: trim(self.country),
            phone: trim_opt(self.phone),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub promo_code: Option<String>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Owners see their own orders; admins see everything. Guest orders are
    /// admin-only after checkout.
    pub fn is_visible_to(&self, viewer: &SessionUser) -> bool {
        viewer.is_admin || self.user_id == Some(viewer.id)
    }
}

/// `price` is the unit price at the moment the order was placed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
    pub price: Decimal,
}

/// An order item with the current product, if it still exists.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderLine {
    #[serde(flatten)]
    pub item: OrderItem,
    pub product: Option<Product>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderLine>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: u32,
    pub price: Decimal,
}

/// Everything needed to write an order and its items in one go.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder {
    pub user_id: Option<Uuid>,
    pub quote: PriceQuote,
    pub promo_code: Option<String>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: String,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn into_records(self) -> (Order, Vec<OrderItem>) {
        let now = Utc::now();
        let order = Order {
            id: Uuid::now_v7(),
            user_id: self.user_id,
            status: OrderStatus::Pending,
            subtotal: self.quote.subtotal,
            discount: self.quote.discount,
            shipping_cost: self.quote.shipping_cost,
            tax: self.quote.tax,
            total: self.quote.total,
            promo_code: self.promo_code,
            shipping_address: self.shipping_address,
            billing_address: self.billing_address,
            payment_method: self.payment_method,
            created_at: now,
            updated_at: now,
        };
        let items = self.items.into_iter().map(|i| OrderItem {
            id: Uuid::now_v7(), order_id: order.id, product_id: i.product_id, quantity: i.quantity, price: i.price,
        }).collect();
        (order, items)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("unknown order status '{0}'")]
    UnknownStatus(String),
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

#[cfg(test)]
pub(crate) fn sample_address() -> Address {
    Address {
        first_name: "Ada".into(), last_name: "Lovelace".into(), address1: "1 Trail Way".into(),
        address2: None, city: "Boulder".into(), state: "CO".into(), postal_code: "80301".into(),
        country: "US".into(), phone: None,
    }
}

#[cfg(test)]
pub(crate) fn sample_new_order(user_id: Option<Uuid>) -> NewOrder {
    NewOrder {
        user_id, quote: crate::domain::pricing::quote(std::iter::empty(), None), promo_code: None,
        shipping_address: sample_address(), billing_address: sample_address(),
        payment_method: "credit_card".into(), items: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_workflow() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Processing".parse::<OrderStatus>().unwrap(), OrderStatus::Processing);
        assert_eq!("shipped".parse::<OrderStatus>(), Err(OrderError::UnknownStatus("shipped".into())));
    }

    #[test]
    fn test_address_validation() {
        assert!(sample_address().validate().is_ok());

        let address = Address { city: "   ".into(), postal_code: String::new(), ..sample_address() }.normalized();
        let errors = address.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("city"));
        assert!(fields.contains_key("postal_code"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_visibility() {
        let owner = SessionUser { id: Uuid::now_v7(), is_admin: false };
        let stranger = SessionUser { id: Uuid::now_v7(), is_admin: false };
        let admin = SessionUser { id: Uuid::now_v7(), is_admin: true };
        let (order, _) = sample_new_order(Some(owner.id)).into_records();
        assert!(order.is_visible_to(&owner));
        assert!(order.is_visible_to(&admin));
        assert!(!order.is_visible_to(&stranger));
    }
}

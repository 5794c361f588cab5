//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::Product;

/// The key a cart is located by: a signed-in user or an anonymous session token.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CartIdentity {
    User(Uuid),
    Session(String),
}

impl CartIdentity {
    /// Fresh anonymous token, stored in the session by the caller.
    pub fn new_session_token() -> String { Uuid::new_v4().simple().to_string() }
}

/// Exactly one of `user_id` and `session_id` is set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn for_identity(identity: &CartIdentity) -> Self {
        let (user_id, session_id) = match identity {
            CartIdentity::User(id) => (Some(*id), None),
            CartIdentity::Session(token) => (None, Some(token.clone())),
        };
        Self { id: Uuid::now_v7(), user_id, session_id, created_at: Utc::now() }
    }

    pub fn belongs_to(&self, identity: &CartIdentity) -> bool {
        match identity {
            CartIdentity::User(id) => self.user_id == Some(*id),
            CartIdentity::Session(token) => self.session_id.as_deref() == Some(token.as_str()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
}

/// A cart item joined with its live product.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: Product,
}

impl CartLine {
    pub fn unit_price(&self) -> Decimal { self.product.price }
    pub fn line_total(&self) -> Decimal { self.product.price * Decimal::from(self.item.quantity) }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CartContents {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
}

impl CartContents {
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn item_count(&self) -> u32 { self.lines.iter().map(|l| l.item.quantity).sum() }

    /// `(unit price, quantity)` pairs in the shape the pricing calculator takes.
    pub fn priced_lines(&self) -> impl Iterator<Item = (Decimal, u32)> + '_ {
        self.lines.iter().map(|l| (l.unit_price(), l.item.quantity))
    }

}

/// True when both slices hold the same items with the same quantities and unit
/// prices, in any order.
pub fn same_lines(current: &[CartLine], expected: &[CartLine]) -> bool {
    if current.len() != expected.len() { return false; }
    let key = |l: &CartLine| (l.item.id, l.item.product_id, l.item.quantity, l.unit_price());
    let mut a: Vec<_> = current.iter().map(key).collect();
    let mut b: Vec<_> = expected.iter().map(key).collect();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

//! Who is making a request, as far as the cart/order core cares.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use super::aggregates::CartIdentity;

/// Authenticated user as written into the session by the auth middleware.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    #[serde(default)]
    pub is_admin: bool,
}

impl SessionUser {
    pub fn cart_identity(&self) -> CartIdentity { CartIdentity::User(self.id) }
}

/// The caller of a cart or checkout operation: the signed-in user, if any,
/// and the identity their cart is keyed by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shopper {
    pub user: Option<SessionUser>,
    pub cart: CartIdentity,
}

impl Shopper {
    pub fn signed_in(user: SessionUser) -> Self {
        Self { cart: user.cart_identity(), user: Some(user) }
    }

    pub fn guest(token: impl Into<String>) -> Self {
        Self { user: None, cart: CartIdentity::Session(token.into()) }
    }

    pub fn user_id(&self) -> Option<Uuid> { self.user.map(|u| u.id) }
}

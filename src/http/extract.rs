//! Request extractors.
//!
//! The session is owned by the `tower-sessions` layer. Authentication lives
//! elsewhere and only leaves a [`SessionUser`] under [`session_keys::USER`];
//! anonymous shoppers get a random cart token under
//! [`session_keys::CART_TOKEN`] the first time they touch the cart.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tower_sessions::Session;

use crate::domain::aggregates::CartIdentity;
use crate::domain::identity::{SessionUser, Shopper};
use crate::StorefrontError;

pub mod session_keys {
    /// Written by the authentication layer.
    pub const USER: &str = "user";
    pub const CART_TOKEN: &str = "cart_token";
}

// =============================================================================
// Body, query and path with storefront errors
// =============================================================================

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(StorefrontError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(StorefrontError))]
pub struct Query<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(StorefrontError))]
pub struct Path<T>(pub T);

impl From<JsonRejection> for StorefrontError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid("body", rejection.body_text())
    }
}

impl From<QueryRejection> for StorefrontError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid("query", rejection.body_text())
    }
}

impl From<PathRejection> for StorefrontError {
    fn from(rejection: PathRejection) -> Self {
        Self::invalid("path", rejection.body_text())
    }
}

// =============================================================================
// Session identity
// =============================================================================

fn session(parts: &Parts) -> Result<Session, StorefrontError> {
    parts.extensions.get::<Session>().cloned()
        .ok_or_else(|| StorefrontError::Internal("session layer is not installed".into()))
}

fn session_failure(e: tower_sessions::session::Error) -> StorefrontError {
    StorefrontError::Internal(format!("session store: {e}"))
}

async fn session_user(session: &Session) -> Result<Option<SessionUser>, StorefrontError> {
    session.get::<SessionUser>(session_keys::USER).await.map_err(session_failure)
}

/// Whoever is shopping: the signed-in user, or an anonymous session that is
/// given a cart token on first use.
pub struct CurrentShopper(pub Shopper);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentShopper {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session(parts)?;
        if let Some(user) = session_user(&session).await? {
            return Ok(Self(Shopper::signed_in(user)));
        }

        let token = match session.get::<String>(session_keys::CART_TOKEN).await.map_err(session_failure)? {
            Some(token) => token,
            None => {
                let token = CartIdentity::new_session_token();
                session.insert(session_keys::CART_TOKEN, &token).await.map_err(session_failure)?;
                tracing::debug!("issued anonymous cart token");
                token
            }
        };
        Ok(Self(Shopper::guest(token)))
    }
}

/// The signed-in user, if any. Never rejects for anonymous requests.
pub struct CurrentUser(pub Option<SessionUser>);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(&session(parts)?).await?))
    }
}

/// Admin-only routes. Anonymous and non-admin callers both get 403.
pub struct AdminUser(pub SessionUser);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match session_user(&session(parts)?).await? {
            Some(user) if user.is_admin => Ok(Self(user)),
            _ => Err(StorefrontError::Forbidden("Admin access required".into())),
        }
    }
}

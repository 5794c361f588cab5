//! Checkout and customer order routes.

use axum::extract::State;
use axum::http::StatusCode;
use uuid::Uuid;

use super::extract::{CurrentShopper, CurrentUser, Json, Path};
use crate::domain::aggregates::{Order, OrderDetails};
use crate::services::CheckoutRequest;
use crate::state::AppState;
use crate::{Result, StorefrontError};

pub async fn place_order(
    State(state): State<AppState>,
    CurrentShopper(shopper): CurrentShopper,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = state.orders().place_order(&shopper, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Vec<Order>>> {
    let user = user.ok_or(StorefrontError::Unauthenticated)?;
    Ok(Json(state.orders().list_for_user(&user).await?))
}

pub async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetails>> {
    Ok(Json(state.orders().get_order(user.as_ref(), id).await?))
}

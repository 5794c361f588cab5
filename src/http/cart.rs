//! Cart routes. Every route works for anonymous shoppers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{CurrentShopper, Json, Path, Query};
use crate::domain::aggregates::CartItem;
use crate::services::cart::{AddItemRequest, UpdateItemRequest};
use crate::services::CartView;
use crate::state::AppState;
use crate::Result;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartParams {
    pub promo_code: Option<String>,
}

pub async fn get_cart(
    State(state): State<AppState>,
    CurrentShopper(shopper): CurrentShopper,
    Query(params): Query<CartParams>,
) -> Result<Json<CartView>> {
    Ok(Json(state.carts().view(&shopper.cart, params.promo_code.as_deref()).await?))
}

pub async fn add_item(
    State(state): State<AppState>,
    CurrentShopper(shopper): CurrentShopper,
    Json(request): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartItem>)> {
    let item = state.carts().add_item(&shopper.cart, request.product_id, request.quantity).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// 200 with the item, or 204 when the quantity removed it.
pub async fn update_item(
    State(state): State<AppState>,
    CurrentShopper(shopper): CurrentShopper,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Response> {
    Ok(match state.carts().update_item(&shopper.cart, id, request.quantity).await? {
        Some(item) => Json(item).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

pub async fn remove_item(
    State(state): State<AppState>,
    CurrentShopper(shopper): CurrentShopper,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.carts().remove_item(&shopper.cart, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_cart(State(state): State<AppState>, CurrentShopper(shopper): CurrentShopper) -> Result<StatusCode> {
    state.carts().clear(&shopper.cart).await?;
    Ok(StatusCode::NO_CONTENT)
}

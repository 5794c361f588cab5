//! Public catalog routes.

use axum::extract::State;
use serde_json::{json, Value};

use super::extract::{Json, Path, Query};
use crate::domain::aggregates::{Category, Product, ProductPage};
use crate::services::catalog::ProductListParams;
use crate::state::AppState;
use crate::Result;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "trailhead-storefront",
        "events": if state.events().is_connected() { "nats" } else { "log" },
    }))
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog().list_categories().await?))
}

pub async fn get_category(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Category>> {
    Ok(Json(state.catalog().category_by_slug(&slug).await?))
}

pub async fn list_products(State(state): State<AppState>, Query(params): Query<ProductListParams>) -> Result<Json<ProductPage>> {
    Ok(Json(state.catalog().list_products(params).await?))
}

pub async fn get_product(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Product>> {
    Ok(Json(state.catalog().product_by_slug(&slug).await?))
}

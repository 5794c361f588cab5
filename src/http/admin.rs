//! Admin routes: order status and catalog maintenance.

use axum::extract::State;
use axum::http::StatusCode;
use uuid::Uuid;

use super::extract::{AdminUser, Json, Path};
use crate::domain::aggregates::{Category, Order, Product};
use crate::services::catalog::{CreateCategoryRequest, CreateProductRequest, UpdateCategoryRequest, UpdateProductRequest};
use crate::services::orders::StatusUpdateRequest;
use crate::state::AppState;
use crate::Result;

pub async fn list_orders(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list_all().await?))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Order>> {
    let order = state.orders().update_status(id, &request.status).await?;
    tracing::info!(admin_id = %admin.id, order_id = %id, status = %order.status, "order status set");
    Ok(Json(order))
}

pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    Ok((StatusCode::CREATED, Json(state.catalog().create_category(request).await?)))
}

pub async fn update_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>> {
    Ok(Json(state.catalog().update_category(id, request).await?))
}

pub async fn delete_category(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    state.catalog().delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    Ok((StatusCode::CREATED, Json(state.catalog().create_product(request).await?)))
}

pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog().update_product(id, request).await?))
}

pub async fn delete_product(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    state.catalog().delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Cart endpoints. Every route acts on the caller's own cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::{CartSnapshot, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::Caller;
use crate::state::{AppState, Backend};

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct RemoveItemsRequest {
    pub product_ids: Vec<ProductId>,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Serialize)]
pub struct RemovedResponse {
    pub removed: u64,
}

#[derive(Serialize)]
pub struct ClearedResponse {
    pub cleared: bool,
}

/// GET /cart
#[tracing::instrument(skip(state))]
pub async fn get<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Caller(user_id): Caller,
) -> Result<Json<CartSnapshot>, ApiError> {
    Ok(Json(state.cart.snapshot(user_id).await?))
}

/// POST /cart/items: add to the stored quantity.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Caller(user_id): Caller,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartItemResponse>, ApiError> {
    let quantity = state
        .cart
        .add_item(user_id, req.product_id, req.quantity)
        .await?;
    Ok(Json(CartItemResponse {
        product_id: req.product_id,
        quantity,
    }))
}

/// PUT /cart/items/{product_id}: overwrite the quantity; zero removes.
#[tracing::instrument(skip(state, req))]
pub async fn set_quantity<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Caller(user_id): Caller,
    Path(product_id): Path<ProductId>,
    Json(req): Json<SetQuantityRequest>,
) -> Result<Json<CartItemResponse>, ApiError> {
    state
        .cart
        .set_quantity(user_id, product_id, req.quantity)
        .await?;
    Ok(Json(CartItemResponse {
        product_id,
        quantity: req.quantity.max(0),
    }))
}

/// DELETE /cart/items/{product_id}
#[tracing::instrument(skip(state))]
pub async fn remove_item<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Caller(user_id): Caller,
    Path(product_id): Path<ProductId>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = state.cart.remove_item(user_id, product_id).await?;
    Ok(Json(RemovedResponse {
        removed: u64::from(removed),
    }))
}

/// DELETE /cart/items
#[tracing::instrument(skip(state, req))]
pub async fn remove_items<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Caller(user_id): Caller,
    Json(req): Json<RemoveItemsRequest>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = state.cart.remove_items(user_id, &req.product_ids).await?;
    Ok(Json(RemovedResponse { removed }))
}

/// DELETE /cart
#[tracing::instrument(skip(state))]
pub async fn clear<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Caller(user_id): Caller,
) -> Result<Json<ClearedResponse>, ApiError> {
    let cleared = state.cart.clear(user_id).await?;
    Ok(Json(ClearedResponse { cleared }))
}

//! Order creation, reads and status transitions.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::{OrderLines, OrderRequest};
use domain::{Order, OrderDetails, OrderId, PaymentMethod, ShippingInfo};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::Caller;
use crate::state::{AppState, Backend};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub lines: OrderLines,
    pub shipping: ShippingInfo,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

// -- Handlers --

/// POST /orders: reserve stock and persist a new order.
#[tracing::instrument(skip(state, req))]
pub async fn create<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Caller(user_id): Caller,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetails>), ApiError> {
    let request = OrderRequest {
        user_id,
        lines: req.lines,
        shipping: req.shipping,
        payment_method: req.payment_method,
    };
    let details = state.factory.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// GET /orders: the caller's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Caller(user_id): Caller,
) -> Result<Json<Vec<OrderDetails>>, ApiError> {
    Ok(Json(state.queries.list_by_user(user_id).await?))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Caller(user_id): Caller,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetails>, ApiError> {
    Ok(Json(state.queries.get_by_id(user_id, id).await?))
}

/// GET /orders/by-no/{order_no}
#[tracing::instrument(skip(state))]
pub async fn get_by_order_no<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Caller(user_id): Caller,
    Path(order_no): Path<String>,
) -> Result<Json<OrderDetails>, ApiError> {
    Ok(Json(state.queries.get_by_order_no(user_id, &order_no).await?))
}

/// PUT /orders/{id}/cancel: owner cancels an unpaid order; stock returns.
#[tracing::instrument(skip(state))]
pub async fn cancel<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Caller(user_id): Caller,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.compensator.cancel_order(user_id, id).await?))
}

/// PUT /orders/{id}/ship: merchant action.
#[tracing::instrument(skip(state))]
pub async fn ship<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.machine.ship(id).await?))
}

/// PUT /orders/{id}/receive: owner confirms delivery.
#[tracing::instrument(skip(state))]
pub async fn receive<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Caller(user_id): Caller,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.machine.confirm_receipt(user_id, id).await?))
}

/// PUT /orders/{id}/refund: merchant refunds a paid, unshipped order.
#[tracing::instrument(skip(state))]
pub async fn refund<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.compensator.refund(id).await?))
}

//! HTTP API server for the order lifecycle engine.
//!
//! Provides REST endpoints for carts, order creation, status transitions and
//! payment callbacks, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{
    AppState, Backend, InMemoryBackend, PostgresBackend, in_memory_state, postgres_state,
    seed_catalog,
};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<B: Backend>(
    state: Arc<AppState<B>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/cart",
            get(routes::cart::get::<B>).delete(routes::cart::clear::<B>),
        )
        .route(
            "/cart/items",
            post(routes::cart::add_item::<B>).delete(routes::cart::remove_items::<B>),
        )
        .route(
            "/cart/items/{product_id}",
            put(routes::cart::set_quantity::<B>).delete(routes::cart::remove_item::<B>),
        )
        .route(
            "/orders",
            post(routes::orders::create::<B>).get(routes::orders::list::<B>),
        )
        .route("/orders/{id}", get(routes::orders::get::<B>))
        .route(
            "/orders/by-no/{order_no}",
            get(routes::orders::get_by_order_no::<B>),
        )
        .route("/orders/{id}/cancel", put(routes::orders::cancel::<B>))
        .route("/orders/{id}/ship", put(routes::orders::ship::<B>))
        .route("/orders/{id}/receive", put(routes::orders::receive::<B>))
        .route("/orders/{id}/refund", put(routes::orders::refund::<B>))
        .route(
            "/orders/notify/payment-success",
            post(routes::payments::payment_success::<B>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

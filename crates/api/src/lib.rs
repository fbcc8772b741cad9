//! HTTP API server with observability for the warehouse stock engine.
//!
//! Provides REST endpoints for inventory and catalog uploads, sellable
//! listings and sales, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use engine::{Inventory, SaleConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use stock_store::{ArticleLedger, ProductCatalog};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<L, C> {
    pub inventory: Inventory<L, C>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L, C>(state: Arc<AppState<L, C>>, metrics_handle: PrometheusHandle) -> Router
where
    L: ArticleLedger + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/api/inventory",
            get(routes::inventory::list::<L, C>).post(routes::inventory::upload::<L, C>),
        )
        .route(
            "/api/products",
            get(routes::products::list::<L, C>).post(routes::products::upload::<L, C>),
        )
        .route(
            "/api/products/{id}",
            get(routes::products::get::<L, C>).patch(routes::products::sell::<L, C>),
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

/// Creates the application state over the given stores.
pub fn create_default_state<L, C>(
    ledger: L,
    catalog: C,
    sale_config: SaleConfig,
) -> Arc<AppState<L, C>>
where
    L: ArticleLedger + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    Arc::new(AppState {
        inventory: Inventory::with_sale_config(ledger, catalog, sale_config),
    })
}

//! HTTP surface for the order pipeline.
//!
//! Exposes webhook endpoints for inbound shop and provider events,
//! read endpoints for orders and tokens, and the usual health and
//! Prometheus metrics routes, with structured logging via tracing.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use pipeline::{
    FulfillmentDispatcher, InMemoryBlockchainClient, InMemoryFulfillmentProvider,
    InMemoryMetadataStore, IssuanceCoordinator, PipelineOrchestrator, RetryPolicy, TracingRelay,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/events/order-created", post(routes::events::order_created::<S>))
        .route(
            "/events/payment-confirmed",
            post(routes::events::payment_confirmed::<S>),
        )
        .route(
            "/events/fulfillment-status",
            post(routes::events::fulfillment_status::<S>),
        )
        .route("/events/cancellation", post(routes::events::cancellation::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/nft/metadata/{token_id}", get(routes::nft::metadata::<S>))
        .route("/nft/owner/{token_id}", get(routes::nft::owner::<S>))
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

/// Creates the default application state wiring the pipeline to
/// in-memory provider, chain and metadata clients.
pub fn create_default_state<S: OrderStore + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    let store = Arc::new(store);
    let provider = Arc::new(InMemoryFulfillmentProvider::new());
    let chain = Arc::new(InMemoryBlockchainClient::new());
    let metadata = Arc::new(InMemoryMetadataStore::new(config.shop_url.clone()));

    let dispatcher = FulfillmentDispatcher::new(
        store.clone(),
        provider.clone(),
        RetryPolicy::default(),
        config.max_dispatch_in_flight,
    );
    let issuance = IssuanceCoordinator::new(
        store.clone(),
        chain.clone(),
        metadata.clone(),
        RetryPolicy::default(),
        config.shop_url.clone(),
    );
    let orchestrator = PipelineOrchestrator::new(
        store.clone(),
        dispatcher,
        issuance,
        Arc::new(TracingRelay::new()),
    );

    Arc::new(AppState {
        store,
        provider,
        chain,
        metadata,
        orchestrator,
    })
}

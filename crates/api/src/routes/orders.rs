//! Order read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::OrderId;
use domain::{Order, OrderStatus, PaymentStatus};
use order_store::{OrderFilter, OrderStore, Page};
use pipeline::{
    InMemoryBlockchainClient, InMemoryFulfillmentProvider, InMemoryMetadataStore,
    PipelineOrchestrator, TracingRelay,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub store: Arc<S>,
    pub provider: Arc<InMemoryFulfillmentProvider>,
    pub chain: Arc<InMemoryBlockchainClient>,
    pub metadata: Arc<InMemoryMetadataStore>,
    pub orchestrator: PipelineOrchestrator<
        S,
        InMemoryFulfillmentProvider,
        InMemoryBlockchainClient,
        InMemoryMetadataStore,
        TracingRelay,
    >,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub variant: Option<String>,
    pub product_type: String,
    pub nft_enabled: bool,
}

#[derive(Serialize)]
pub struct NftResponse {
    pub token_id: String,
    pub mint_tx_ref: Option<String>,
    pub minted: bool,
}

#[derive(Serialize)]
pub struct FailureResponse {
    pub stage: String,
    pub reason: String,
    pub at: String,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub customer_contact: String,
    pub wallet_address: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub fulfillment_ref: Option<String>,
    pub nft: Option<NftResponse>,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub currency: String,
    pub cancellation_reason: Option<String>,
    pub failures: Vec<FailureResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl OrderResponse {
    pub(crate) fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.order_id().to_string(),
            customer_contact: order.customer_contact().to_string(),
            wallet_address: order.wallet_address().map(String::from),
            status: order.status().to_string(),
            payment_status: order.payment_status().to_string(),
            fulfillment_ref: order.fulfillment_ref().map(|r| r.to_string()),
            nft: order.nft().map(|n| NftResponse {
                token_id: n.token_id.to_string(),
                mint_tx_ref: n.mint_tx_ref.clone(),
                minted: n.minted,
            }),
            items: order
                .items()
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                    variant: item.variant.clone(),
                    product_type: format!("{:?}", item.product_type).to_lowercase(),
                    nft_enabled: item.nft_enabled,
                })
                .collect(),
            total_cents: order.total_amount().cents(),
            currency: order.currency().to_string(),
            cancellation_reason: order.cancellation_reason().map(String::from),
            failures: order
                .failures()
                .iter()
                .map(|f| FailureResponse {
                    stage: f.stage.to_string(),
                    reason: f.reason.clone(),
                    at: f.at.to_rfc3339(),
                })
                .collect(),
            created_at: order.created_at().to_rfc3339(),
            updated_at: order.updated_at().to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u64,
}

// -- Handlers --

/// GET /orders/:id — load an order by id.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = OrderId::new(id.clone());
    let order = state
        .store
        .get(&order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;

    Ok(Json(OrderResponse::from_order(&order)))
}

/// GET /orders — page through orders, newest first.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let filter = OrderFilter {
        status: query.status,
        payment_status: query.payment_status,
    };
    let page = Page::new(query.page.unwrap_or(1), query.per_page.unwrap_or(20));

    let result = state.store.list(filter, page).await?;

    Ok(Json(OrderListResponse {
        orders: result.orders.iter().map(OrderResponse::from_order).collect(),
        page: result.page,
        per_page: result.per_page,
        pages: result.pages(),
        total: result.total,
    }))
}

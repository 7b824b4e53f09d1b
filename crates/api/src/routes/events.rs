//! Inbound webhook endpoints for shop and provider events.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::OrderId;
use order_store::OrderStore;
use pipeline::{CancellationReport, NewOrder, PaymentReport, StatusReport};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::orders::{AppState, OrderResponse};

#[derive(Deserialize)]
pub struct PaymentConfirmedEvent {
    pub order_id: OrderId,
}

#[derive(Deserialize)]
pub struct FulfillmentStatusEvent {
    pub order_id: OrderId,
    pub status: String,
}

#[derive(Deserialize)]
pub struct CancellationEvent {
    pub order_id: OrderId,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub order: OrderResponse,
}

/// POST /events/order-created — register a new order from the shop front.
#[tracing::instrument(skip(state, event))]
pub async fn order_created<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(event): Json<NewOrder>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let order = state.orchestrator.handle_order_created(event).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            order: OrderResponse::from_order(&order),
        }),
    ))
}

/// POST /events/payment-confirmed — confirm payment and run both
/// pipeline branches.
#[tracing::instrument(skip(state, event), fields(order_id = %event.order_id))]
pub async fn payment_confirmed<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(event): Json<PaymentConfirmedEvent>,
) -> Result<Json<PaymentReport>, ApiError> {
    let report = state
        .orchestrator
        .handle_payment_confirmed(&event.order_id)
        .await?;
    Ok(Json(report))
}

/// POST /events/fulfillment-status — apply a provider delivery status.
#[tracing::instrument(skip(state, event), fields(order_id = %event.order_id))]
pub async fn fulfillment_status<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(event): Json<FulfillmentStatusEvent>,
) -> Result<Json<StatusReport>, ApiError> {
    let report = state
        .orchestrator
        .handle_fulfillment_status(&event.order_id, &event.status)
        .await?;
    Ok(Json(report))
}

/// POST /events/cancellation — cancel an order.
#[tracing::instrument(skip(state, event), fields(order_id = %event.order_id))]
pub async fn cancellation<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(event): Json<CancellationEvent>,
) -> Result<Json<CancellationReport>, ApiError> {
    let reason = event.reason.as_deref().unwrap_or("cancellation requested");
    let report = state
        .orchestrator
        .handle_cancellation(&event.order_id, reason)
        .await?;
    Ok(Json(report))
}

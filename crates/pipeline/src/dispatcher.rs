//! Fulfillment dispatch against the external provider.

use std::sync::Arc;

use common::OrderId;
use domain::{FulfillmentRef, OrderError, OrderStatus, PipelineStage};
use order_store::{OrderStore, StoreError};

use crate::clients::{FulfillmentItem, FulfillmentProvider, FulfillmentRequest};
use crate::error::{PipelineError, ProviderError, Result};
use crate::retry::{RetryPolicy, call_with_retry};

/// Result of a dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The order was submitted and the provider reference recorded.
    Dispatched(FulfillmentRef),
    /// A provider reference already existed; nothing was submitted.
    AlreadyDispatched(FulfillmentRef),
    /// No line item needs the provider, or the order is cancelled.
    NotRequired,
    /// The provider rejected the order; the failure is annotated.
    Failed { reason: String },
}

/// Submits paid orders to the fulfillment provider exactly once.
///
/// The recorded provider reference is the idempotency guard; the provider's
/// own deduplication on the merchant order id backs it up for the window
/// between a successful submission and the store write. Concurrent
/// dispatches across orders are bounded by a semaphore.
pub struct FulfillmentDispatcher<S, P> {
    store: Arc<S>,
    provider: Arc<P>,
    policy: RetryPolicy,
    permits: Arc<tokio::sync::Semaphore>,
}

impl<S, P> FulfillmentDispatcher<S, P>
where
    S: OrderStore,
    P: FulfillmentProvider,
{
    /// Creates a dispatcher allowing `max_in_flight` provider submissions
    /// at a time.
    pub fn new(store: Arc<S>, provider: Arc<P>, policy: RetryPolicy, max_in_flight: usize) -> Self {
        Self {
            store,
            provider,
            policy,
            permits: Arc::new(tokio::sync::Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Dispatches the order to the provider if it needs shipping and has
    /// not been dispatched before.
    #[tracing::instrument(skip(self))]
    pub async fn dispatch(&self, order_id: &OrderId) -> Result<DispatchOutcome> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or_else(|| PipelineError::OrderNotFound(order_id.clone()))?;

        if let Some(existing) = order.fulfillment_ref() {
            return Ok(DispatchOutcome::AlreadyDispatched(existing.clone()));
        }
        if !order.requires_fulfillment() || order.status() == OrderStatus::Cancelled {
            return Ok(DispatchOutcome::NotRequired);
        }

        let request = FulfillmentRequest {
            external_id: order.order_id().clone(),
            recipient: order.shipping_address().clone(),
            items: order
                .items()
                .iter()
                .filter(|i| i.product_type.is_fulfillable())
                .map(|i| FulfillmentItem {
                    product_id: i.product_id.clone(),
                    product_name: i.product_name.clone(),
                    variant: i.variant.clone(),
                    quantity: i.quantity,
                })
                .collect(),
        };

        let start = std::time::Instant::now();
        let submission = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| PipelineError::ProviderUnavailable("dispatch limiter closed".into()))?;
            call_with_retry(&self.policy, "fulfillment_submit", || {
                self.provider.submit_order(request.clone())
            })
            .await
        };
        metrics::histogram!("fulfillment_dispatch_seconds").record(start.elapsed().as_secs_f64());

        match submission {
            Ok(fulfillment_ref) => {
                let recorded = self
                    .store
                    // Only the reference is recorded here; the delivery
                    // status moves on provider webhooks, not on dispatch.
                    .update(order_id, |o| o.set_fulfillment_ref(fulfillment_ref.clone()))
                    .await;

                match recorded {
                    Ok(_) => {
                        metrics::counter!("fulfillment_dispatched_total").increment(1);
                        tracing::info!(%order_id, %fulfillment_ref, "order dispatched");
                        Ok(DispatchOutcome::Dispatched(fulfillment_ref))
                    }
                    Err(StoreError::Rejected(OrderError::FulfillmentAlreadyDispatched {
                        existing,
                    })) => Ok(DispatchOutcome::AlreadyDispatched(FulfillmentRef::new(
                        existing,
                    ))),
                    Err(e) => Err(e.into()),
                }
            }
            Err(ProviderError::Transient(reason)) => {
                Err(PipelineError::ProviderUnavailable(reason))
            }
            Err(ProviderError::Permanent(reason)) => {
                metrics::counter!("fulfillment_rejected_total").increment(1);
                tracing::error!(%order_id, %reason, "provider rejected the order");
                self.store
                    .update(order_id, |o| {
                        note_failure_once(o, PipelineStage::Fulfillment, &reason);
                        Ok(())
                    })
                    .await?;
                Ok(DispatchOutcome::Failed { reason })
            }
        }
    }

    /// Requests provider-side cancellation for a dispatched order.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, fulfillment_ref: &FulfillmentRef) -> Result<()> {
        call_with_retry(&self.policy, "fulfillment_cancel", || {
            self.provider.cancel_order(fulfillment_ref)
        })
        .await
        .map_err(|e| PipelineError::ProviderUnavailable(e.to_string()))
    }
}

/// Annotates a failure unless the same annotation is already present, so
/// webhook redelivery does not pile up duplicates.
pub(crate) fn note_failure_once(order: &mut domain::Order, stage: PipelineStage, reason: &str) {
    let already_noted = order
        .failures()
        .iter()
        .any(|f| f.stage == stage && f.reason == reason);
    if !already_noted {
        order.note_failure(stage, reason);
    }
}

//! Event-driven pipeline orchestration.
//!
//! Each inbound shop event is handled by committing the state change to
//! the store first, then running the affected branches, then notifying.
//! No store lock is ever held across an external call; the branch
//! workers re-read and re-guard instead.

use std::sync::Arc;

use common::OrderId;
use domain::{Order, OrderStatus, StatusApplied};
use order_store::OrderStore;
use serde::Serialize;

use crate::clients::{BlockchainClient, FulfillmentProvider, MetadataStore};
use crate::dispatcher::{DispatchOutcome, FulfillmentDispatcher};
use crate::error::{PipelineError, Result};
use crate::events::{NewOrder, ProviderStatusUpdate, map_provider_status};
use crate::issuance::{IssuanceCoordinator, IssueOutcome};
use crate::relay::{Notification, NotificationRelay};

/// Outcome of one branch of the payment pipeline, reported per branch so
/// a partial failure never masks the other branch's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BranchReport {
    Completed { detail: String },
    Pending { detail: String },
    Skipped,
    Failed { reason: String },
}

/// Report for a payment-confirmed event.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReport {
    pub order_id: OrderId,
    /// False when this was a redelivered confirmation.
    pub newly_paid: bool,
    pub fulfillment: BranchReport,
    pub mint: BranchReport,
}

/// Report for a provider delivery-status event.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub order_id: OrderId,
    /// False when the update was stale and discarded.
    pub applied: bool,
    pub status: OrderStatus,
}

/// Report for a cancellation request.
#[derive(Debug, Clone, Serialize)]
pub struct CancellationReport {
    pub order_id: OrderId,
    /// False when the order was already cancelled.
    pub cancelled: bool,
    pub refunded: bool,
    /// A minted token is never revoked by cancellation.
    pub token_retained: bool,
}

/// Drives the order pipeline from inbound shop and provider events.
pub struct PipelineOrchestrator<S, P, B, M, N> {
    store: Arc<S>,
    dispatcher: FulfillmentDispatcher<S, P>,
    issuance: IssuanceCoordinator<S, B, M>,
    relay: Arc<N>,
}

impl<S, P, B, M, N> PipelineOrchestrator<S, P, B, M, N>
where
    S: OrderStore,
    P: FulfillmentProvider,
    B: BlockchainClient,
    M: MetadataStore,
    N: NotificationRelay,
{
    /// Creates a new orchestrator.
    pub fn new(
        store: Arc<S>,
        dispatcher: FulfillmentDispatcher<S, P>,
        issuance: IssuanceCoordinator<S, B, M>,
        relay: Arc<N>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            issuance,
            relay,
        }
    }

    /// Access to the issuance coordinator for read-side token queries.
    pub fn issuance(&self) -> &IssuanceCoordinator<S, B, M> {
        &self.issuance
    }

    /// Registers a new order. Duplicate order ids are rejected without
    /// touching the existing record.
    #[tracing::instrument(skip(self, new_order), fields(order_id = %new_order.order_id))]
    pub async fn handle_order_created(&self, new_order: NewOrder) -> Result<Order> {
        metrics::counter!("pipeline_events_total", "event" => "order_created").increment(1);

        let order = new_order.into_order()?;
        self.store.create(order.clone()).await?;
        tracing::info!(order_id = %order.order_id(), total = %order.total_amount(), "order registered");

        self.relay
            .publish(Notification::OrderReceived {
                order_id: order.order_id().clone(),
            })
            .await;

        Ok(order)
    }

    /// Confirms payment and runs the fulfillment and issuance branches.
    ///
    /// Redelivered confirmations are no-ops on the payment axis but still
    /// run both branches, which heals partial progress from an earlier
    /// attempt.
    #[tracing::instrument(skip(self))]
    pub async fn handle_payment_confirmed(&self, order_id: &OrderId) -> Result<PaymentReport> {
        metrics::counter!("pipeline_events_total", "event" => "payment_confirmed").increment(1);

        let (newly_paid, _) = self
            .store
            .update(order_id, |o| o.confirm_payment())
            .await?;

        if newly_paid {
            self.relay
                .publish(Notification::PaymentConfirmed {
                    order_id: order_id.clone(),
                })
                .await;
        }

        // The branches are independent: a transient outage on one side is
        // held back until the other branch has run, then re-surfaced so
        // the source redelivers. Completed work survives the redelivery
        // through the idempotency guards.
        let mut deferred: Option<PipelineError> = None;

        let fulfillment = match self.dispatcher.dispatch(order_id).await {
            Ok(DispatchOutcome::Dispatched(fulfillment_ref)) => {
                self.relay
                    .publish(Notification::FulfillmentDispatched {
                        order_id: order_id.clone(),
                        fulfillment_ref: fulfillment_ref.to_string(),
                    })
                    .await;
                BranchReport::Completed {
                    detail: fulfillment_ref.to_string(),
                }
            }
            Ok(DispatchOutcome::AlreadyDispatched(fulfillment_ref)) => BranchReport::Completed {
                detail: fulfillment_ref.to_string(),
            },
            Ok(DispatchOutcome::NotRequired) => BranchReport::Skipped,
            Ok(DispatchOutcome::Failed { reason }) => BranchReport::Failed { reason },
            Err(e @ PipelineError::ProviderUnavailable(_)) => {
                let reason = e.to_string();
                deferred = Some(e);
                BranchReport::Failed { reason }
            }
            Err(e) => return Err(e),
        };

        let mint = match self.issuance.issue(order_id).await {
            Ok(IssueOutcome::Minted { token_id, tx_ref }) => {
                self.relay
                    .publish(Notification::CollectibleMinted {
                        order_id: order_id.clone(),
                        token_id,
                        tx_ref: tx_ref.clone(),
                    })
                    .await;
                BranchReport::Completed { detail: tx_ref }
            }
            Ok(IssueOutcome::AlreadyMinted { token_id }) => BranchReport::Completed {
                detail: token_id.to_string(),
            },
            Ok(IssueOutcome::Pending { token_id }) => BranchReport::Pending {
                detail: token_id.to_string(),
            },
            Ok(IssueOutcome::NotEligible) => BranchReport::Skipped,
            Ok(IssueOutcome::Failed { reason, .. }) => BranchReport::Failed { reason },
            Err(e @ PipelineError::ProviderUnavailable(_)) => {
                let reason = e.to_string();
                deferred.get_or_insert(e);
                BranchReport::Failed { reason }
            }
            Err(e) => return Err(e),
        };

        if let Some(e) = deferred {
            return Err(e);
        }

        Ok(PaymentReport {
            order_id: order_id.clone(),
            newly_paid,
            fulfillment,
            mint,
        })
    }

    /// Applies a provider delivery-status update, discarding stale ones.
    #[tracing::instrument(skip(self))]
    pub async fn handle_fulfillment_status(
        &self,
        order_id: &OrderId,
        provider_status: &str,
    ) -> Result<StatusReport> {
        metrics::counter!("pipeline_events_total", "event" => "fulfillment_status").increment(1);

        match map_provider_status(provider_status)? {
            ProviderStatusUpdate::Progress(target) => {
                let (applied, _) = self
                    .store
                    .update(order_id, |o| o.apply_provider_status(target))
                    .await?;

                match applied {
                    StatusApplied::Applied(status) => {
                        self.relay
                            .publish(Notification::DeliveryStatusChanged {
                                order_id: order_id.clone(),
                                status,
                            })
                            .await;
                        Ok(StatusReport {
                            order_id: order_id.clone(),
                            applied: true,
                            status,
                        })
                    }
                    StatusApplied::Stale(status) => {
                        metrics::counter!("pipeline_stale_status_total").increment(1);
                        tracing::debug!(%order_id, %provider_status, "stale status discarded");
                        Ok(StatusReport {
                            order_id: order_id.clone(),
                            applied: false,
                            status,
                        })
                    }
                }
            }
            ProviderStatusUpdate::Cancelled => {
                let report = self
                    .handle_cancellation(order_id, "cancelled by fulfillment provider")
                    .await?;
                Ok(StatusReport {
                    order_id: order_id.clone(),
                    applied: report.cancelled,
                    status: OrderStatus::Cancelled,
                })
            }
        }
    }

    /// Cancels an order, refunding a captured payment and propagating the
    /// cancellation to the provider. A minted token stays with the buyer.
    #[tracing::instrument(skip(self))]
    pub async fn handle_cancellation(
        &self,
        order_id: &OrderId,
        reason: &str,
    ) -> Result<CancellationReport> {
        metrics::counter!("pipeline_events_total", "event" => "cancellation").increment(1);

        let ((cancelled, refunded), order) = self
            .store
            .update(order_id, |o| {
                let cancelled = o.cancel(reason)?;
                let refunded = if cancelled
                    && o.payment_status() == domain::PaymentStatus::Paid
                {
                    o.refund()?
                } else {
                    false
                };
                Ok((cancelled, refunded))
            })
            .await?;

        if cancelled {
            // Provider-side cancellation is best effort; the provider may
            // already have shipped or may be unreachable.
            if let Some(fulfillment_ref) = order.fulfillment_ref()
                && let Err(e) = self.dispatcher.cancel(fulfillment_ref).await
            {
                tracing::warn!(%order_id, %fulfillment_ref, error = %e,
                    "provider cancellation failed");
            }

            self.relay
                .publish(Notification::OrderCancelled {
                    order_id: order_id.clone(),
                    reason: reason.to_string(),
                })
                .await;
            metrics::counter!("pipeline_cancellations_total").increment(1);
        }

        Ok(CancellationReport {
            order_id: order_id.clone(),
            cancelled,
            refunded,
            token_retained: order.nft_minted(),
        })
    }
}

//! The Order record and its transition guards.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, TokenId};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;

use super::{
    FailureNote, FulfillmentRef, LineItem, NftRecord, OrderStatus, PaymentStatus, PipelineStage,
    ShippingAddress,
};

/// Result of applying a provider status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusApplied {
    /// The status advanced.
    Applied(OrderStatus),
    /// The update was stale or a duplicate and was discarded.
    Stale(OrderStatus),
}

/// A merchant order with its composite pipeline state.
///
/// Mutated exclusively through guard methods; each guard enforces the
/// invariants for its axis and is idempotent where the pipeline requires
/// at-least-once delivery tolerance. The order is never deleted, only
/// terminalized via cancellation or refund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    order_id: OrderId,

    customer_contact: String,

    /// Wallet that receives the collectible token, when the customer
    /// provided one.
    wallet_address: Option<String>,

    items: Vec<LineItem>,

    total_amount: Money,
    currency: String,

    status: OrderStatus,
    payment_status: PaymentStatus,

    /// External provider order id, set at most once.
    fulfillment_ref: Option<FulfillmentRef>,

    /// Token state, set at most once.
    nft: Option<NftRecord>,

    shipping_address: ShippingAddress,

    cancellation_reason: Option<String>,

    #[serde(default)]
    failures: Vec<FailureNote>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order in `pending`/`pending` state.
    ///
    /// Validates that at least one item exists and that every item carries
    /// a positive quantity and price. The total is computed from the items.
    pub fn create(
        order_id: OrderId,
        customer_contact: impl Into<String>,
        wallet_address: Option<String>,
        shipping_address: ShippingAddress,
        items: Vec<LineItem>,
        currency: impl Into<String>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        for item in &items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    quantity: item.quantity,
                });
            }
            if !item.unit_price.is_positive() {
                return Err(OrderError::InvalidPrice {
                    price: item.unit_price.cents(),
                });
            }
        }

        let total_amount = items
            .iter()
            .fold(Money::zero(), |acc, item| acc + item.total_price());
        let now = Utc::now();

        Ok(Self {
            order_id,
            customer_contact: customer_contact.into(),
            wallet_address,
            items,
            total_amount,
            currency: currency.into(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            fulfillment_ref: None,
            nft: None,
            shipping_address,
            cancellation_reason: None,
            failures: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

// Query methods
impl Order {
    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn customer_contact(&self) -> &str {
        &self.customer_contact
    }

    pub fn wallet_address(&self) -> Option<&str> {
        self.wallet_address.as_deref()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn fulfillment_ref(&self) -> Option<&FulfillmentRef> {
        self.fulfillment_ref.as_ref()
    }

    pub fn nft(&self) -> Option<&NftRecord> {
        self.nft.as_ref()
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn failures(&self) -> &[FailureNote] {
        &self.failures
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True if any line item needs the fulfillment provider.
    pub fn requires_fulfillment(&self) -> bool {
        self.items.iter().any(|i| i.product_type.is_fulfillable())
    }

    /// The line item whose purchase entitles the buyer to a token, if any.
    ///
    /// The first eligible item anchors the token identity; orders carry at
    /// most one token.
    pub fn nft_eligible_item(&self) -> Option<&LineItem> {
        self.items.iter().find(|i| i.is_nft_eligible())
    }

    /// True if the token has been minted and confirmed.
    pub fn nft_minted(&self) -> bool {
        self.nft.as_ref().is_some_and(|n| n.minted)
    }
}

// Transition guards
impl Order {
    /// Confirms payment.
    ///
    /// Returns `true` on the transition to `paid`, `false` when the order
    /// was already paid (idempotent re-delivery). Rejected once the payment
    /// axis is terminal or the order is cancelled.
    pub fn confirm_payment(&mut self) -> Result<bool, OrderError> {
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "confirm payment",
            });
        }
        match self.payment_status {
            PaymentStatus::Paid => Ok(false),
            PaymentStatus::Pending => {
                self.payment_status = PaymentStatus::Paid;
                Ok(true)
            }
            current => Err(OrderError::InvalidPaymentTransition {
                current,
                action: "confirm payment",
            }),
        }
    }

    /// Marks the payment as failed. Idempotent; only valid from `pending`.
    pub fn fail_payment(&mut self) -> Result<bool, OrderError> {
        match self.payment_status {
            PaymentStatus::Failed => Ok(false),
            PaymentStatus::Pending => {
                self.payment_status = PaymentStatus::Failed;
                Ok(true)
            }
            current => Err(OrderError::InvalidPaymentTransition {
                current,
                action: "fail payment",
            }),
        }
    }

    /// Records a refund of a paid order. Idempotent.
    pub fn refund(&mut self) -> Result<bool, OrderError> {
        match self.payment_status {
            PaymentStatus::Refunded => Ok(false),
            PaymentStatus::Paid => {
                self.payment_status = PaymentStatus::Refunded;
                Ok(true)
            }
            current => Err(OrderError::InvalidPaymentTransition {
                current,
                action: "refund",
            }),
        }
    }

    /// Records the provider order reference. Fails if one is already set;
    /// callers check [`Order::fulfillment_ref`] first and skip re-dispatch.
    pub fn set_fulfillment_ref(&mut self, fulfillment_ref: FulfillmentRef) -> Result<(), OrderError> {
        if let Some(existing) = &self.fulfillment_ref {
            return Err(OrderError::FulfillmentAlreadyDispatched {
                existing: existing.as_str().to_string(),
            });
        }
        self.fulfillment_ref = Some(fulfillment_ref);
        Ok(())
    }

    /// Records a submitted-but-unconfirmed mint for the given token.
    ///
    /// Idempotent for the same token; a different token identity is a
    /// mismatch since token derivation is deterministic per order.
    pub fn record_mint_pending(&mut self, token_id: TokenId) -> Result<(), OrderError> {
        match &self.nft {
            Some(record) if record.token_id != token_id => Err(OrderError::TokenMismatch {
                existing: record.token_id,
                requested: token_id,
            }),
            Some(_) => Ok(()),
            None => {
                self.nft = Some(NftRecord::pending(token_id));
                Ok(())
            }
        }
    }

    /// Records a confirmed mint. One-shot: returns `true` when the record
    /// transitions to minted, `false` when the same token was already
    /// confirmed (idempotent re-delivery).
    pub fn record_mint_confirmed(
        &mut self,
        token_id: TokenId,
        mint_tx_ref: impl Into<String>,
    ) -> Result<bool, OrderError> {
        match &self.nft {
            Some(record) if record.token_id != token_id => Err(OrderError::TokenMismatch {
                existing: record.token_id,
                requested: token_id,
            }),
            Some(record) if record.minted => Ok(false),
            _ => {
                self.nft = Some(NftRecord::confirmed(token_id, mint_tx_ref));
                Ok(true)
            }
        }
    }

    /// Applies a provider-driven delivery status.
    ///
    /// Only `processing`/`shipped`/`delivered` are provider-reachable.
    /// Updates that do not strictly advance the monotonic rank are stale
    /// and discarded.
    pub fn apply_provider_status(
        &mut self,
        new_status: OrderStatus,
    ) -> Result<StatusApplied, OrderError> {
        let Some(new_rank) = new_status.rank() else {
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "apply cancelled via provider status",
            });
        };
        if new_rank == 0 {
            // Providers never move an order back to pending.
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "apply pending via provider status",
            });
        }
        let Some(current_rank) = self.status.rank() else {
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "apply provider status",
            });
        };

        if new_rank <= current_rank {
            return Ok(StatusApplied::Stale(self.status));
        }
        self.status = new_status;
        Ok(StatusApplied::Applied(new_status))
    }

    /// Cancels the order.
    ///
    /// Valid only from `pending`/`processing`. Returns `false` if already
    /// cancelled. An already-minted token remains valid; cancellation never
    /// reverses external work.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<bool, OrderError> {
        match self.status {
            OrderStatus::Cancelled => Ok(false),
            s if s.can_cancel() => {
                self.status = OrderStatus::Cancelled;
                self.cancellation_reason = Some(reason.into());
                Ok(true)
            }
            current => Err(OrderError::InvalidStateTransition {
                current,
                action: "cancel",
            }),
        }
    }

    /// Attaches a permanent-failure annotation for operator attention.
    pub fn note_failure(&mut self, stage: PipelineStage, reason: impl Into<String>) {
        self.failures.push(FailureNote {
            stage,
            reason: reason.into(),
            at: Utc::now(),
        });
    }

    /// Stamps `updated_at`. Called by the store on every successful
    /// mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

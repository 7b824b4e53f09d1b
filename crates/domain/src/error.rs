//! Domain error types.

use common::TokenId;
use thiserror::Error;

use crate::order::{OrderStatus, PaymentStatus};

/// Errors raised by Order transition guards.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The requested delivery-status transition is not defined.
    #[error("invalid transition: cannot {action} while order is {current}")]
    InvalidStateTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// The requested payment-status transition is not defined.
    #[error("invalid payment transition: cannot {action} while payment is {current}")]
    InvalidPaymentTransition {
        current: PaymentStatus,
        action: &'static str,
    },

    /// A fulfillment reference has already been recorded for this order.
    #[error("fulfillment already dispatched with reference {existing}")]
    FulfillmentAlreadyDispatched { existing: String },

    /// A mint was recorded against a different token identity.
    #[error("token mismatch: order already bound to {existing}, requested {requested}")]
    TokenMismatch {
        existing: TokenId,
        requested: TokenId,
    },

    /// An order must contain at least one line item.
    #[error("order has no items")]
    NoItems,

    /// Line item quantity must be positive.
    #[error("invalid quantity: {quantity}")]
    InvalidQuantity { quantity: u32 },

    /// Line item unit price must be positive.
    #[error("invalid price: {price} cents")]
    InvalidPrice { price: i64 },
}

//! Domain layer for the order fulfillment and NFT issuance pipeline.
//!
//! This crate provides the Order record with its two independent status
//! axes (delivery lifecycle and payment), the one-shot NFT record, and the
//! guard methods that enforce every transition invariant. All mutation goes
//! through guard methods returning [`OrderError`]; the record itself never
//! talks to external systems.

pub mod error;
pub mod order;

pub use error::OrderError;
pub use order::{
    FailureNote, FulfillmentRef, LineItem, NftRecord, Order, OrderStatus, PaymentStatus,
    PipelineStage, ProductType, ShippingAddress, StatusApplied,
};

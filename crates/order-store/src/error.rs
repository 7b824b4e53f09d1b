use common::OrderId;
use domain::OrderError;
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An order with this id already exists; creation never overwrites.
    #[error("duplicate order: {0}")]
    DuplicateOrder(OrderId),

    /// The order was not found.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The mutation was rejected by a domain guard; nothing was written.
    #[error("mutation rejected: {0}")]
    Rejected(#[from] OrderError),

    /// Optimistic concurrency retries were exhausted.
    #[error("version conflict on order {order_id} after {attempts} attempts")]
    VersionConflict { order_id: OrderId, attempts: u32 },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

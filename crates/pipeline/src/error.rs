use common::OrderId;
use domain::OrderError;
use order_store::StoreError;
use thiserror::Error;

/// Failure of a fulfillment provider or metadata host call.
///
/// Transient failures are retried and, once the retry budget is exhausted,
/// surfaced so the webhook source redelivers. Permanent failures are
/// annotated on the order for operator attention and never retried.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Worth retrying: timeouts, rate limits, 5xx-class responses.
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// Retrying cannot help: the request itself is unacceptable.
    #[error("permanent provider failure: {0}")]
    Permanent(String),
}

/// Failure of a mint submission or status poll.
#[derive(Debug, Error)]
pub enum MintError {
    /// The contract refused the mint; retrying the same call cannot help.
    #[error("mint rejected: {0}")]
    Rejected(String),

    /// The node or network misbehaved; the submission state is unknown.
    #[error("transient mint failure: {0}")]
    Transient(String),
}

/// Errors surfaced by pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The inbound event payload fails domain validation.
    #[error("invalid order: {0}")]
    Invalid(#[from] OrderError),

    /// Transient retries were exhausted; the caller should redeliver.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider sent a delivery status this pipeline does not know.
    #[error("unknown provider status: {0}")]
    UnknownProviderStatus(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

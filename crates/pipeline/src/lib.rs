//! Order fulfillment and token issuance pipeline.
//!
//! Inbound shop events (order created, payment confirmed, delivery status,
//! cancellation) drive two independent branches per order: physical
//! fulfillment through an external provider and collectible token issuance
//! on chain. Every handler tolerates at-least-once webhook delivery; the
//! store's atomic per-order update and the domain's transition guards make
//! redelivery and concurrent delivery safe.

pub mod clients;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod issuance;
pub mod orchestrator;
pub mod relay;
pub mod retry;

pub use clients::{
    BlockchainClient, FulfillmentItem, FulfillmentProvider, FulfillmentRequest,
    InMemoryBlockchainClient, InMemoryFulfillmentProvider, InMemoryMetadataStore, MetadataStore,
    MintOutcome, MintStatus, NftAttribute, NftMetadata,
};
pub use dispatcher::{DispatchOutcome, FulfillmentDispatcher};
pub use error::{MintError, PipelineError, ProviderError, Result};
pub use events::{NewOrder, ProviderStatusUpdate, map_provider_status};
pub use issuance::{IssuanceCoordinator, IssueOutcome};
pub use orchestrator::{
    BranchReport, CancellationReport, PaymentReport, PipelineOrchestrator, StatusReport,
};
pub use relay::{Notification, NotificationRelay, RecordingRelay, TracingRelay};
pub use retry::{RetryPolicy, call_with_retry};

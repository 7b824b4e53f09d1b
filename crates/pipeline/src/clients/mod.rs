//! External service clients used by the pipeline.

pub mod blockchain;
pub mod fulfillment;
pub mod metadata;

pub use blockchain::{BlockchainClient, InMemoryBlockchainClient, MintOutcome, MintStatus};
pub use fulfillment::{
    FulfillmentItem, FulfillmentProvider, FulfillmentRequest, InMemoryFulfillmentProvider,
};
pub use metadata::{InMemoryMetadataStore, MetadataStore, NftAttribute, NftMetadata};

//! Token metadata documents and their hosting store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::TokenId;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A single attribute in the standard collectible metadata shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftAttribute {
    pub trait_type: String,
    pub value: String,
}

/// ERC-721 style metadata document served to wallets and marketplaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub external_url: String,
    pub attributes: Vec<NftAttribute>,
}

/// Trait for the metadata host.
///
/// The document must be reachable at its URL before the mint transaction
/// is submitted, so a wallet resolving the fresh token never sees a 404.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Publishes the document and returns its public URL. Publishing the
    /// same token again overwrites the document (idempotent).
    async fn publish(
        &self,
        token_id: TokenId,
        metadata: NftMetadata,
    ) -> Result<String, ProviderError>;

    /// Fetches a previously published document.
    async fn fetch(&self, token_id: TokenId) -> Result<Option<NftMetadata>, ProviderError>;
}

#[derive(Debug, Default)]
struct InMemoryMetadataState {
    documents: HashMap<TokenId, NftMetadata>,
    fail_on_publish: bool,
}

/// In-memory metadata store for testing.
#[derive(Debug, Clone)]
pub struct InMemoryMetadataStore {
    base_url: String,
    state: Arc<RwLock<InMemoryMetadataState>>,
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self::new("https://shop.example")
    }
}

impl InMemoryMetadataStore {
    /// Creates a new in-memory metadata store serving under `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            state: Arc::default(),
        }
    }

    /// Configures publishing to fail transiently.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().unwrap().fail_on_publish = fail;
    }

    /// Returns the number of published documents.
    pub fn document_count(&self) -> usize {
        self.state.read().unwrap().documents.len()
    }

    /// The public URL a token's document is served from.
    pub fn url_for(&self, token_id: TokenId) -> String {
        format!("{}/nft/metadata/{token_id}", self.base_url)
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn publish(
        &self,
        token_id: TokenId,
        metadata: NftMetadata,
    ) -> Result<String, ProviderError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_publish {
            return Err(ProviderError::Transient(
                "metadata host unavailable".to_string(),
            ));
        }
        state.documents.insert(token_id, metadata);
        Ok(self.url_for(token_id))
    }

    async fn fetch(&self, token_id: TokenId) -> Result<Option<NftMetadata>, ProviderError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .documents
            .get(&token_id)
            .cloned())
    }
}

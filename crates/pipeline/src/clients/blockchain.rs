//! Blockchain client trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::TokenId;

use crate::error::MintError;

/// Result of a mint submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintOutcome {
    /// The transaction was mined; the token exists on chain.
    Confirmed { tx_ref: String },

    /// The transaction was accepted but not yet mined. Resolution is by
    /// polling [`BlockchainClient::mint_status`]; the mint is never
    /// resubmitted.
    Pending,
}

/// Result of a mint status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintStatus {
    Confirmed { tx_ref: String },
    Pending,
    /// The node has no record of the token or its transaction.
    Unknown,
}

/// Trait for the chain-side token operations.
#[async_trait]
pub trait BlockchainClient: Send + Sync {
    /// Submits a mint of `token_id` to `to`, pointing at the published
    /// metadata document.
    async fn mint(
        &self,
        to: &str,
        token_id: TokenId,
        metadata_url: &str,
    ) -> Result<MintOutcome, MintError>;

    /// Polls the confirmation state of a previously submitted mint.
    async fn mint_status(&self, token_id: TokenId) -> Result<MintStatus, MintError>;

    /// Returns the current owner of a token, or `None` if it does not
    /// exist on chain.
    async fn owner_of(&self, token_id: TokenId) -> Result<Option<String>, MintError>;
}

#[derive(Debug, Clone)]
struct MintedToken {
    owner: String,
    #[allow(dead_code)]
    metadata_url: String,
    tx_ref: String,
}

#[derive(Debug, Default)]
struct InMemoryChainState {
    minted: HashMap<TokenId, MintedToken>,
    pending: HashMap<TokenId, MintedToken>,
    next_tx: u64,
    reject_on_mint: bool,
    pending_on_mint: bool,
    fail_on_status: bool,
}

/// In-memory blockchain client for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlockchainClient {
    state: Arc<RwLock<InMemoryChainState>>,
}

impl InMemoryBlockchainClient {
    /// Creates a new in-memory blockchain client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the contract to reject mints.
    pub fn set_reject_on_mint(&self, reject: bool) {
        self.state.write().unwrap().reject_on_mint = reject;
    }

    /// Configures mints to be accepted but left unconfirmed.
    pub fn set_pending_on_mint(&self, pending: bool) {
        self.state.write().unwrap().pending_on_mint = pending;
    }

    /// Configures status polls to fail transiently.
    pub fn set_fail_on_status(&self, fail: bool) {
        self.state.write().unwrap().fail_on_status = fail;
    }

    /// Mines all pending mints.
    pub fn confirm_pending(&self) {
        let mut state = self.state.write().unwrap();
        let pending: Vec<(TokenId, MintedToken)> = state.pending.drain().collect();
        for (token_id, token) in pending {
            state.minted.insert(token_id, token);
        }
    }

    /// Returns the number of tokens that exist on chain.
    pub fn minted_count(&self) -> usize {
        self.state.read().unwrap().minted.len()
    }

    fn next_tx_ref(state: &mut InMemoryChainState) -> String {
        let tx = 0xabc + state.next_tx;
        state.next_tx += 1;
        format!("0x{tx:x}")
    }
}

#[async_trait]
impl BlockchainClient for InMemoryBlockchainClient {
    async fn mint(
        &self,
        to: &str,
        token_id: TokenId,
        metadata_url: &str,
    ) -> Result<MintOutcome, MintError> {
        let mut state = self.state.write().unwrap();

        if state.reject_on_mint {
            return Err(MintError::Rejected("contract reverted".to_string()));
        }
        if state.minted.contains_key(&token_id) || state.pending.contains_key(&token_id) {
            return Err(MintError::Rejected(format!(
                "token {token_id} already minted"
            )));
        }

        let tx_ref = Self::next_tx_ref(&mut state);
        let token = MintedToken {
            owner: to.to_string(),
            metadata_url: metadata_url.to_string(),
            tx_ref: tx_ref.clone(),
        };

        if state.pending_on_mint {
            state.pending.insert(token_id, token);
            return Ok(MintOutcome::Pending);
        }

        state.minted.insert(token_id, token);
        Ok(MintOutcome::Confirmed { tx_ref })
    }

    async fn mint_status(&self, token_id: TokenId) -> Result<MintStatus, MintError> {
        let state = self.state.read().unwrap();
        if state.fail_on_status {
            return Err(MintError::Transient("node unavailable".to_string()));
        }
        if let Some(token) = state.minted.get(&token_id) {
            return Ok(MintStatus::Confirmed {
                tx_ref: token.tx_ref.clone(),
            });
        }
        if state.pending.contains_key(&token_id) {
            return Ok(MintStatus::Pending);
        }
        Ok(MintStatus::Unknown)
    }

    async fn owner_of(&self, token_id: TokenId) -> Result<Option<String>, MintError> {
        let state = self.state.read().unwrap();
        Ok(state.minted.get(&token_id).map(|t| t.owner.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, ProductId};

    fn token() -> TokenId {
        TokenId::derive(&OrderId::new("ORD-1"), &ProductId::new("item-1"))
    }

    #[tokio::test]
    async fn mint_confirms_with_tx_ref() {
        let chain = InMemoryBlockchainClient::new();

        let outcome = chain
            .mint("0xf00", token(), "https://shop.example/nft/metadata/1")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MintOutcome::Confirmed {
                tx_ref: "0xabc".to_string()
            }
        );

        let owner = chain.owner_of(token()).await.unwrap();
        assert_eq!(owner.as_deref(), Some("0xf00"));
    }

    #[tokio::test]
    async fn double_mint_is_rejected() {
        let chain = InMemoryBlockchainClient::new();
        chain.mint("0xf00", token(), "url").await.unwrap();

        let result = chain.mint("0xf00", token(), "url").await;
        assert!(matches!(result, Err(MintError::Rejected(_))));
        assert_eq!(chain.minted_count(), 1);
    }

    #[tokio::test]
    async fn pending_mint_confirms_via_poll() {
        let chain = InMemoryBlockchainClient::new();
        chain.set_pending_on_mint(true);

        let outcome = chain.mint("0xf00", token(), "url").await.unwrap();
        assert_eq!(outcome, MintOutcome::Pending);
        assert_eq!(chain.mint_status(token()).await.unwrap(), MintStatus::Pending);
        assert!(chain.owner_of(token()).await.unwrap().is_none());

        chain.confirm_pending();
        assert_eq!(
            chain.mint_status(token()).await.unwrap(),
            MintStatus::Confirmed {
                tx_ref: "0xabc".to_string()
            }
        );
        assert_eq!(chain.owner_of(token()).await.unwrap().as_deref(), Some("0xf00"));
    }

    #[tokio::test]
    async fn unknown_token_has_no_owner() {
        let chain = InMemoryBlockchainClient::new();
        assert_eq!(chain.mint_status(token()).await.unwrap(), MintStatus::Unknown);
        assert!(chain.owner_of(token()).await.unwrap().is_none());
    }
}

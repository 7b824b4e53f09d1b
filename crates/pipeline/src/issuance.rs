//! Collectible token issuance.
//!
//! Token identity is derived deterministically from the order and the
//! entitling line item, so every retry of the issuance path targets the
//! same token and the contract's uniqueness makes a double mint
//! impossible. The metadata document is published before the mint is
//! submitted, and a submitted-but-unconfirmed mint is only ever resolved
//! by polling, never by resubmitting.

use std::sync::Arc;

use common::{OrderId, TokenId};
use domain::{LineItem, Order, PipelineStage};
use order_store::OrderStore;

use crate::clients::{
    BlockchainClient, MetadataStore, MintOutcome, MintStatus, NftAttribute, NftMetadata,
};
use crate::dispatcher::note_failure_once;
use crate::error::{MintError, PipelineError, ProviderError, Result};
use crate::retry::{RetryPolicy, call_with_retry};

/// Result of an issuance attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    /// The token was minted and confirmed in this attempt.
    Minted { token_id: TokenId, tx_ref: String },
    /// The token was already confirmed on a previous attempt.
    AlreadyMinted { token_id: TokenId },
    /// The mint is submitted but unconfirmed; poll again later.
    Pending { token_id: TokenId },
    /// No line item entitles the buyer to a token.
    NotEligible,
    /// The mint cannot happen; the failure is annotated on the order.
    Failed { token_id: TokenId, reason: String },
}

/// Coordinates metadata publication and minting for paid orders.
pub struct IssuanceCoordinator<S, B, M> {
    store: Arc<S>,
    chain: Arc<B>,
    metadata: Arc<M>,
    policy: RetryPolicy,
    shop_url: String,
}

impl<S, B, M> IssuanceCoordinator<S, B, M>
where
    S: OrderStore,
    B: BlockchainClient,
    M: MetadataStore,
{
    /// Creates a new issuance coordinator. `shop_url` is the public base
    /// URL used for the metadata `external_url` field.
    pub fn new(
        store: Arc<S>,
        chain: Arc<B>,
        metadata: Arc<M>,
        policy: RetryPolicy,
        shop_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            chain,
            metadata,
            policy,
            shop_url: shop_url.into(),
        }
    }

    /// Issues the order's token if it is entitled to one.
    ///
    /// Safe to call repeatedly: confirmed mints short-circuit, pending
    /// mints are resolved by polling, and the deterministic token identity
    /// keeps every attempt pointed at the same token.
    #[tracing::instrument(skip(self))]
    pub async fn issue(&self, order_id: &OrderId) -> Result<IssueOutcome> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or_else(|| PipelineError::OrderNotFound(order_id.clone()))?;

        let Some(item) = order.nft_eligible_item() else {
            return Ok(IssueOutcome::NotEligible);
        };
        let token_id = TokenId::derive(order_id, &item.product_id);

        if let Some(record) = order.nft() {
            if record.minted {
                return Ok(IssueOutcome::AlreadyMinted {
                    token_id: record.token_id,
                });
            }
            // A mint is already in flight; never resubmit.
            return self.poll_pending(order_id, record.token_id).await;
        }

        let Some(wallet) = order.wallet_address() else {
            let reason = "no wallet address on order".to_string();
            self.store
                .update(order_id, |o| {
                    note_failure_once(o, PipelineStage::Mint, &reason);
                    Ok(())
                })
                .await?;
            return Ok(IssueOutcome::Failed { token_id, reason });
        };
        let wallet = wallet.to_string();

        // Publish the document first so the token never dangles.
        let document = build_metadata(&order, item, &self.shop_url);
        let metadata_url = call_with_retry(&self.policy, "metadata_publish", || {
            self.metadata.publish(token_id, document.clone())
        })
        .await
        .map_err(|e| match e {
            ProviderError::Transient(reason) => PipelineError::ProviderUnavailable(reason),
            ProviderError::Permanent(reason) => PipelineError::ProviderUnavailable(reason),
        })?;

        // Record the submission before it happens, so a crash between the
        // chain call and the confirmation write leaves a pollable record
        // instead of an invisible mint.
        self.store
            .update(order_id, |o| o.record_mint_pending(token_id))
            .await?;

        let start = std::time::Instant::now();
        let submission =
            tokio::time::timeout(self.policy.call_timeout, self.chain.mint(&wallet, token_id, &metadata_url))
                .await;
        metrics::histogram!("mint_submit_seconds").record(start.elapsed().as_secs_f64());

        match submission {
            Ok(Ok(MintOutcome::Confirmed { tx_ref })) => {
                self.store
                    .update(order_id, |o| o.record_mint_confirmed(token_id, &tx_ref))
                    .await?;
                metrics::counter!("mint_confirmed_total").increment(1);
                tracing::info!(%order_id, %token_id, %tx_ref, "token minted");
                Ok(IssueOutcome::Minted { token_id, tx_ref })
            }
            Ok(Ok(MintOutcome::Pending)) => {
                tracing::info!(%order_id, %token_id, "mint submitted, awaiting confirmation");
                Ok(IssueOutcome::Pending { token_id })
            }
            Ok(Err(MintError::Rejected(reason))) => {
                // A concurrent attempt may have minted the token between
                // our guard read and the submission; the chain decides.
                if let IssueOutcome::Minted { token_id, tx_ref } =
                    self.poll_pending(order_id, token_id).await?
                {
                    return Ok(IssueOutcome::Minted { token_id, tx_ref });
                }
                metrics::counter!("mint_rejected_total").increment(1);
                tracing::error!(%order_id, %token_id, %reason, "mint rejected");
                self.store
                    .update(order_id, |o| {
                        note_failure_once(o, PipelineStage::Mint, &reason);
                        Ok(())
                    })
                    .await?;
                Ok(IssueOutcome::Failed { token_id, reason })
            }
            // The submission may or may not have landed; the pending
            // record stays and polling decides.
            Ok(Err(MintError::Transient(reason))) => {
                tracing::warn!(%order_id, %token_id, %reason, "mint submission state unknown");
                Ok(IssueOutcome::Pending { token_id })
            }
            Err(_) => {
                tracing::warn!(%order_id, %token_id, "mint submission timed out");
                Ok(IssueOutcome::Pending { token_id })
            }
        }
    }

    /// Polls the chain for a pending mint and records the confirmation.
    async fn poll_pending(&self, order_id: &OrderId, token_id: TokenId) -> Result<IssueOutcome> {
        let status = call_with_retry(&self.policy, "mint_status", || async {
            self.chain.mint_status(token_id).await.map_err(|e| match e {
                MintError::Transient(reason) => ProviderError::Transient(reason),
                MintError::Rejected(reason) => ProviderError::Permanent(reason),
            })
        })
        .await
        .map_err(|e| PipelineError::ProviderUnavailable(e.to_string()))?;

        match status {
            MintStatus::Confirmed { tx_ref } => {
                self.store
                    .update(order_id, |o| o.record_mint_confirmed(token_id, &tx_ref))
                    .await?;
                metrics::counter!("mint_confirmed_total").increment(1);
                tracing::info!(%order_id, %token_id, %tx_ref, "pending mint confirmed");
                Ok(IssueOutcome::Minted { token_id, tx_ref })
            }
            // Unknown means the node has not seen the transaction yet; the
            // submission is never repeated, so keep waiting.
            MintStatus::Pending | MintStatus::Unknown => {
                Ok(IssueOutcome::Pending { token_id })
            }
        }
    }

    /// Returns the chain-side owner of a token.
    pub async fn verify_owner(&self, token_id: TokenId) -> Result<Option<String>> {
        call_with_retry(&self.policy, "owner_of", || async {
            self.chain.owner_of(token_id).await.map_err(|e| match e {
                MintError::Transient(reason) => ProviderError::Transient(reason),
                MintError::Rejected(reason) => ProviderError::Permanent(reason),
            })
        })
        .await
        .map_err(|e| PipelineError::ProviderUnavailable(e.to_string()))
    }

    /// Fetches the published metadata document for a token.
    pub async fn metadata_for(&self, token_id: TokenId) -> Result<Option<NftMetadata>> {
        self.metadata
            .fetch(token_id)
            .await
            .map_err(|e| PipelineError::ProviderUnavailable(e.to_string()))
    }
}

fn build_metadata(order: &Order, item: &LineItem, shop_url: &str) -> NftMetadata {
    let mut attributes = vec![
        NftAttribute {
            trait_type: "Order".to_string(),
            value: order.order_id().to_string(),
        },
        NftAttribute {
            trait_type: "Product".to_string(),
            value: item.product_id.to_string(),
        },
    ];
    if let Some(variant) = &item.variant {
        attributes.push(NftAttribute {
            trait_type: "Variant".to_string(),
            value: variant.clone(),
        });
    }
    if let Some(wallet) = order.wallet_address() {
        attributes.push(NftAttribute {
            trait_type: "Owner".to_string(),
            value: wallet.to_string(),
        });
    }

    NftMetadata {
        name: item.product_name.clone(),
        description: format!(
            "Collectible issued for order {} of {}",
            order.order_id(),
            item.product_name
        ),
        image: item.image_url.clone(),
        external_url: format!("{}/orders/{}", shop_url, order.order_id()),
        attributes,
    }
}

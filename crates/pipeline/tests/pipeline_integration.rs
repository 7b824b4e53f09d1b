//! End-to-end pipeline tests over the in-memory store and clients.

use std::sync::Arc;

use common::{Money, OrderId, ProductId, TokenId};
use domain::{LineItem, OrderStatus, PaymentStatus, ProductType, ShippingAddress};
use order_store::{InMemoryOrderStore, OrderStore};
use pipeline::{
    BlockchainClient, BranchReport, FulfillmentDispatcher, InMemoryBlockchainClient,
    InMemoryFulfillmentProvider, InMemoryMetadataStore, IssuanceCoordinator, NewOrder,
    PipelineError, PipelineOrchestrator, RecordingRelay, RetryPolicy,
};

type TestOrchestrator = PipelineOrchestrator<
    InMemoryOrderStore,
    InMemoryFulfillmentProvider,
    InMemoryBlockchainClient,
    InMemoryMetadataStore,
    RecordingRelay,
>;

struct Harness {
    orchestrator: TestOrchestrator,
    store: Arc<InMemoryOrderStore>,
    provider: Arc<InMemoryFulfillmentProvider>,
    chain: Arc<InMemoryBlockchainClient>,
    relay: RecordingRelay,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryOrderStore::new());
    let provider = Arc::new(InMemoryFulfillmentProvider::new());
    let chain = Arc::new(InMemoryBlockchainClient::new());
    let metadata = Arc::new(InMemoryMetadataStore::default());
    let relay = RecordingRelay::new();

    let dispatcher = FulfillmentDispatcher::new(
        store.clone(),
        provider.clone(),
        RetryPolicy::immediate(),
        8,
    );
    let issuance = IssuanceCoordinator::new(
        store.clone(),
        chain.clone(),
        metadata.clone(),
        RetryPolicy::immediate(),
        "https://shop.example",
    );
    let orchestrator = PipelineOrchestrator::new(
        store.clone(),
        dispatcher,
        issuance,
        Arc::new(relay.clone()),
    );

    Harness {
        orchestrator,
        store,
        provider,
        chain,
        relay,
    }
}

fn new_order(id: &str) -> NewOrder {
    NewOrder {
        order_id: OrderId::new(id),
        customer_contact: "buyer@example.com".to_string(),
        wallet_address: Some("0xf00".to_string()),
        shipping_address: ShippingAddress {
            name: "Jordan Buyer".to_string(),
            address1: "1 Main St".to_string(),
            address2: None,
            city: "Springfield".to_string(),
            state_code: Some("IL".to_string()),
            zip: "62701".to_string(),
            country: "US".to_string(),
        },
        currency: "USD".to_string(),
        items: vec![
            LineItem::new(
                "item-1",
                "Poster",
                1,
                Money::from_cents(4999),
                ProductType::Physical,
            )
            .with_nft()
            .with_variant("A2"),
        ],
    }
}

fn token_for(order_id: &str) -> TokenId {
    TokenId::derive(&OrderId::new(order_id), &ProductId::new("item-1"))
}

#[tokio::test]
async fn full_lifecycle_happy_path() {
    let h = harness();

    // Order arrives from the shop front.
    let order = h
        .orchestrator
        .handle_order_created(new_order("ORD-1"))
        .await
        .unwrap();
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.total_amount(), Money::from_cents(4999));

    // Payment confirmation triggers both branches.
    let report = h
        .orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await
        .unwrap();
    assert!(report.newly_paid);
    assert_eq!(
        report.fulfillment,
        BranchReport::Completed {
            detail: "P-100".to_string()
        }
    );
    assert_eq!(
        report.mint,
        BranchReport::Completed {
            detail: "0xabc".to_string()
        }
    );

    let stored = h.store.get(&OrderId::new("ORD-1")).await.unwrap().unwrap();
    assert_eq!(stored.payment_status(), PaymentStatus::Paid);
    // Dispatch records the reference only; delivery status waits for the
    // provider's own webhooks.
    assert_eq!(stored.status(), OrderStatus::Pending);
    assert_eq!(stored.fulfillment_ref().unwrap().as_str(), "P-100");
    assert!(stored.nft_minted());
    assert_eq!(stored.nft().unwrap().token_id, token_for("ORD-1"));

    // The chain agrees on ownership.
    assert_eq!(
        h.chain.owner_of(token_for("ORD-1")).await.unwrap().as_deref(),
        Some("0xf00")
    );

    // Provider drives the order to delivery.
    let shipped = h
        .orchestrator
        .handle_fulfillment_status(&OrderId::new("ORD-1"), "shipped")
        .await
        .unwrap();
    assert!(shipped.applied);
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let delivered = h
        .orchestrator
        .handle_fulfillment_status(&OrderId::new("ORD-1"), "delivered")
        .await
        .unwrap();
    assert!(delivered.applied);

    let final_order = h.store.get(&OrderId::new("ORD-1")).await.unwrap().unwrap();
    assert_eq!(final_order.status(), OrderStatus::Delivered);

    // Customer saw the whole journey.
    let kinds: Vec<String> = h
        .relay
        .published()
        .iter()
        .map(|n| serde_json::to_value(n).unwrap()["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        kinds,
        [
            "order_received",
            "payment_confirmed",
            "fulfillment_dispatched",
            "collectible_minted",
            "delivery_status_changed",
            "delivery_status_changed",
        ]
    );
}

#[tokio::test]
async fn duplicate_order_created_is_rejected() {
    let h = harness();
    h.orchestrator
        .handle_order_created(new_order("ORD-1"))
        .await
        .unwrap();

    let result = h.orchestrator.handle_order_created(new_order("ORD-1")).await;
    assert!(matches!(
        result,
        Err(PipelineError::Store(order_store::StoreError::DuplicateOrder(_)))
    ));
    assert_eq!(h.store.order_count().await, 1);
}

#[tokio::test]
async fn redelivered_payment_confirmation_changes_nothing() {
    let h = harness();
    h.orchestrator
        .handle_order_created(new_order("ORD-1"))
        .await
        .unwrap();

    let first = h
        .orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await
        .unwrap();
    assert!(first.newly_paid);

    for _ in 0..3 {
        let again = h
            .orchestrator
            .handle_payment_confirmed(&OrderId::new("ORD-1"))
            .await
            .unwrap();
        assert!(!again.newly_paid);
        assert_eq!(
            again.fulfillment,
            BranchReport::Completed {
                detail: "P-100".to_string()
            }
        );
    }

    // One provider order, one token, despite four deliveries.
    assert_eq!(h.provider.order_count(), 1);
    assert_eq!(h.chain.minted_count(), 1);
}

#[tokio::test]
async fn redelivery_heals_partial_progress() {
    let h = harness();
    h.orchestrator
        .handle_order_created(new_order("ORD-1"))
        .await
        .unwrap();

    // Provider down for longer than the retry budget: the whole event
    // fails so the source redelivers.
    h.provider.set_transient_failures(4);
    let result = h
        .orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await;
    assert!(matches!(result, Err(PipelineError::ProviderUnavailable(_))));

    // Redelivery finds the payment already confirmed and the token
    // already minted, and finishes the fulfillment branch.
    let report = h
        .orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await
        .unwrap();
    assert!(!report.newly_paid);
    assert!(matches!(report.fulfillment, BranchReport::Completed { .. }));
    assert!(matches!(report.mint, BranchReport::Completed { .. }));
}

#[tokio::test]
async fn provider_outage_does_not_delay_minting() {
    let h = harness();
    h.orchestrator
        .handle_order_created(new_order("ORD-1"))
        .await
        .unwrap();

    // Provider down past the first delivery's retry budget, chain
    // healthy: the event still fails so the source redelivers the
    // fulfillment side, but the mint lands now.
    h.provider.set_transient_failures(4);
    let result = h
        .orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await;
    assert!(matches!(result, Err(PipelineError::ProviderUnavailable(_))));
    assert_eq!(h.chain.minted_count(), 1);

    let stored = h.store.get(&OrderId::new("ORD-1")).await.unwrap().unwrap();
    assert!(stored.nft_minted());
    assert!(stored.fulfillment_ref().is_none());

    // Once the provider recovers, redelivery completes the other branch
    // without a second mint.
    let report = h
        .orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await
        .unwrap();
    assert!(matches!(report.fulfillment, BranchReport::Completed { .. }));
    assert_eq!(
        report.mint,
        BranchReport::Completed {
            detail: token_for("ORD-1").to_string()
        }
    );
    assert_eq!(h.chain.minted_count(), 1);
}

#[tokio::test]
async fn concurrent_payment_confirmations_mint_one_token() {
    let h = harness();
    h.orchestrator
        .handle_order_created(new_order("ORD-1"))
        .await
        .unwrap();

    let orchestrator = Arc::new(h.orchestrator);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator
                .handle_payment_confirmed(&OrderId::new("ORD-1"))
                .await
        }));
    }

    let mut newly_paid = 0;
    for handle in handles {
        if let Ok(report) = handle.await.unwrap()
            && report.newly_paid
        {
            newly_paid += 1;
        }
    }

    assert_eq!(newly_paid, 1);
    assert_eq!(h.provider.order_count(), 1);
    assert_eq!(h.chain.minted_count(), 1);

    let stored = h.store.get(&OrderId::new("ORD-1")).await.unwrap().unwrap();
    assert_eq!(stored.nft().unwrap().token_id, token_for("ORD-1"));
}

#[tokio::test]
async fn stale_status_after_delivery_is_discarded() {
    let h = harness();
    h.orchestrator
        .handle_order_created(new_order("ORD-1"))
        .await
        .unwrap();
    h.orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await
        .unwrap();

    h.orchestrator
        .handle_fulfillment_status(&OrderId::new("ORD-1"), "delivered")
        .await
        .unwrap();

    // A late "shipped" webhook arrives out of order.
    let stale = h
        .orchestrator
        .handle_fulfillment_status(&OrderId::new("ORD-1"), "shipped")
        .await
        .unwrap();
    assert!(!stale.applied);
    assert_eq!(stale.status, OrderStatus::Delivered);

    let stored = h.store.get(&OrderId::new("ORD-1")).await.unwrap().unwrap();
    assert_eq!(stored.status(), OrderStatus::Delivered);
}

#[tokio::test]
async fn unknown_provider_status_is_rejected() {
    let h = harness();
    h.orchestrator
        .handle_order_created(new_order("ORD-1"))
        .await
        .unwrap();

    let result = h
        .orchestrator
        .handle_fulfillment_status(&OrderId::new("ORD-1"), "teleported")
        .await;
    assert!(matches!(
        result,
        Err(PipelineError::UnknownProviderStatus(_))
    ));
}

#[tokio::test]
async fn cancellation_refunds_and_propagates() {
    let h = harness();
    h.orchestrator
        .handle_order_created(new_order("ORD-1"))
        .await
        .unwrap();
    h.orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await
        .unwrap();

    let report = h
        .orchestrator
        .handle_cancellation(&OrderId::new("ORD-1"), "customer request")
        .await
        .unwrap();
    assert!(report.cancelled);
    assert!(report.refunded);
    // The already-minted token stays with the buyer.
    assert!(report.token_retained);

    let stored = h.store.get(&OrderId::new("ORD-1")).await.unwrap().unwrap();
    assert_eq!(stored.status(), OrderStatus::Cancelled);
    assert_eq!(stored.payment_status(), PaymentStatus::Refunded);
    assert!(stored.nft_minted());

    // The provider was told to stop.
    let fulfillment_ref = stored.fulfillment_ref().unwrap();
    assert!(h.provider.was_cancelled(fulfillment_ref));

    // A second cancellation is a no-op.
    let again = h
        .orchestrator
        .handle_cancellation(&OrderId::new("ORD-1"), "again")
        .await
        .unwrap();
    assert!(!again.cancelled);
    assert!(!again.refunded);
}

#[tokio::test]
async fn cancellation_after_delivery_is_rejected() {
    let h = harness();
    h.orchestrator
        .handle_order_created(new_order("ORD-1"))
        .await
        .unwrap();
    h.orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await
        .unwrap();
    h.orchestrator
        .handle_fulfillment_status(&OrderId::new("ORD-1"), "delivered")
        .await
        .unwrap();

    let result = h
        .orchestrator
        .handle_cancellation(&OrderId::new("ORD-1"), "too late")
        .await;
    assert!(matches!(
        result,
        Err(PipelineError::Store(order_store::StoreError::Rejected(_)))
    ));
}

#[tokio::test]
async fn provider_side_cancellation_cancels_the_order() {
    let h = harness();
    h.orchestrator
        .handle_order_created(new_order("ORD-1"))
        .await
        .unwrap();
    h.orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await
        .unwrap();

    let report = h
        .orchestrator
        .handle_fulfillment_status(&OrderId::new("ORD-1"), "canceled")
        .await
        .unwrap();
    assert!(report.applied);
    assert_eq!(report.status, OrderStatus::Cancelled);

    let stored = h.store.get(&OrderId::new("ORD-1")).await.unwrap().unwrap();
    assert_eq!(stored.status(), OrderStatus::Cancelled);
    assert_eq!(stored.payment_status(), PaymentStatus::Refunded);
}

#[tokio::test]
async fn unconfirmed_mint_resolves_to_the_same_token() {
    let h = harness();
    h.orchestrator
        .handle_order_created(new_order("ORD-1"))
        .await
        .unwrap();
    h.chain.set_pending_on_mint(true);

    let report = h
        .orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await
        .unwrap();
    assert_eq!(
        report.mint,
        BranchReport::Pending {
            detail: token_for("ORD-1").to_string()
        }
    );

    // The transaction mines; a redelivered confirmation finishes the
    // branch with the original token.
    h.chain.confirm_pending();
    let report = h
        .orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await
        .unwrap();
    assert_eq!(
        report.mint,
        BranchReport::Completed {
            detail: "0xabc".to_string()
        }
    );

    assert_eq!(h.chain.minted_count(), 1);
    let stored = h.store.get(&OrderId::new("ORD-1")).await.unwrap().unwrap();
    assert_eq!(stored.nft().unwrap().token_id, token_for("ORD-1"));
}

#[tokio::test]
async fn mixed_cart_only_ships_physical_items() {
    let h = harness();
    let mut order = new_order("ORD-1");
    order.items.push(LineItem::new(
        "item-2",
        "Wallpaper Pack",
        1,
        Money::from_cents(1500),
        ProductType::Digital,
    ));

    h.orchestrator.handle_order_created(order).await.unwrap();
    h.orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await
        .unwrap();

    let stored = h.store.get(&OrderId::new("ORD-1")).await.unwrap().unwrap();
    let submitted = h
        .provider
        .submitted_order(stored.fulfillment_ref().unwrap())
        .unwrap();
    assert_eq!(submitted.items.len(), 1);
    assert_eq!(submitted.items[0].product_id, ProductId::new("item-1"));
}

#[tokio::test]
async fn digital_only_order_skips_fulfillment_but_mints() {
    let h = harness();
    let order = NewOrder {
        items: vec![
            LineItem::new(
                "item-2",
                "Wallpaper Pack",
                1,
                Money::from_cents(1500),
                ProductType::Digital,
            )
            .with_nft(),
        ],
        ..new_order("ORD-1")
    };

    h.orchestrator.handle_order_created(order).await.unwrap();
    let report = h
        .orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await
        .unwrap();

    assert_eq!(report.fulfillment, BranchReport::Skipped);
    assert!(matches!(report.mint, BranchReport::Completed { .. }));
    assert_eq!(h.provider.order_count(), 0);
    assert_eq!(h.chain.minted_count(), 1);
}

#[tokio::test]
async fn fulfillment_failure_does_not_block_minting() {
    let h = harness();
    h.orchestrator
        .handle_order_created(new_order("ORD-1"))
        .await
        .unwrap();
    h.provider.set_fail_on_submit(true);

    let report = h
        .orchestrator
        .handle_payment_confirmed(&OrderId::new("ORD-1"))
        .await
        .unwrap();

    assert!(matches!(report.fulfillment, BranchReport::Failed { .. }));
    assert!(matches!(report.mint, BranchReport::Completed { .. }));

    let stored = h.store.get(&OrderId::new("ORD-1")).await.unwrap().unwrap();
    assert_eq!(stored.failures().len(), 1);
    assert!(stored.nft_minted());
}

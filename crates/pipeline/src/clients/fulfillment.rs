//! Fulfillment provider trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{OrderId, ProductId};
use domain::{FulfillmentRef, ShippingAddress};

use crate::error::ProviderError;

/// A single shippable line submitted to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub variant: Option<String>,
    pub quantity: u32,
}

/// A provider order submission, correlated by the merchant order id.
#[derive(Debug, Clone)]
pub struct FulfillmentRequest {
    /// Merchant order id, used by the provider for deduplication.
    pub external_id: OrderId,
    pub recipient: ShippingAddress,
    pub items: Vec<FulfillmentItem>,
}

/// Trait for the external print-and-ship provider.
#[async_trait]
pub trait FulfillmentProvider: Send + Sync {
    /// Submits an order for production and shipping.
    ///
    /// Providers deduplicate on `external_id`: resubmitting a known order
    /// returns the existing reference instead of creating a second one.
    async fn submit_order(
        &self,
        request: FulfillmentRequest,
    ) -> Result<FulfillmentRef, ProviderError>;

    /// Requests cancellation of a previously submitted order.
    async fn cancel_order(&self, fulfillment_ref: &FulfillmentRef) -> Result<(), ProviderError>;
}

#[derive(Debug, Default)]
struct InMemoryFulfillmentState {
    orders: HashMap<String, FulfillmentRequest>,
    by_external_id: HashMap<OrderId, FulfillmentRef>,
    cancelled: Vec<FulfillmentRef>,
    next_id: u32,
    fail_on_submit: bool,
    transient_failures: u32,
}

/// In-memory fulfillment provider for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFulfillmentProvider {
    state: Arc<RwLock<InMemoryFulfillmentState>>,
}

impl InMemoryFulfillmentProvider {
    /// Creates a new in-memory fulfillment provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the provider to reject submissions permanently.
    pub fn set_fail_on_submit(&self, fail: bool) {
        self.state.write().unwrap().fail_on_submit = fail;
    }

    /// Configures the next `count` submissions to fail transiently.
    pub fn set_transient_failures(&self, count: u32) {
        self.state.write().unwrap().transient_failures = count;
    }

    /// Returns the number of accepted provider orders.
    pub fn order_count(&self) -> usize {
        self.state.read().unwrap().orders.len()
    }

    /// Returns the submitted request for a provider order, if any.
    pub fn submitted_order(&self, fulfillment_ref: &FulfillmentRef) -> Option<FulfillmentRequest> {
        self.state
            .read()
            .unwrap()
            .orders
            .get(fulfillment_ref.as_str())
            .cloned()
    }

    /// Returns true if cancellation was requested for the provider order.
    pub fn was_cancelled(&self, fulfillment_ref: &FulfillmentRef) -> bool {
        self.state
            .read()
            .unwrap()
            .cancelled
            .contains(fulfillment_ref)
    }
}

#[async_trait]
impl FulfillmentProvider for InMemoryFulfillmentProvider {
    async fn submit_order(
        &self,
        request: FulfillmentRequest,
    ) -> Result<FulfillmentRef, ProviderError> {
        let mut state = self.state.write().unwrap();

        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(ProviderError::Transient(
                "provider temporarily unavailable".to_string(),
            ));
        }
        if state.fail_on_submit {
            return Err(ProviderError::Permanent(
                "provider rejected the order".to_string(),
            ));
        }

        if let Some(existing) = state.by_external_id.get(&request.external_id) {
            return Ok(existing.clone());
        }

        state.next_id += 1;
        let fulfillment_ref = FulfillmentRef::new(format!("P-{}", 99 + state.next_id));
        state
            .by_external_id
            .insert(request.external_id.clone(), fulfillment_ref.clone());
        state
            .orders
            .insert(fulfillment_ref.as_str().to_string(), request);

        Ok(fulfillment_ref)
    }

    async fn cancel_order(&self, fulfillment_ref: &FulfillmentRef) -> Result<(), ProviderError> {
        let mut state = self.state.write().unwrap();
        if !state.orders.contains_key(fulfillment_ref.as_str()) {
            return Err(ProviderError::Permanent(format!(
                "unknown provider order {fulfillment_ref}"
            )));
        }
        state.cancelled.push(fulfillment_ref.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(order_id: &str) -> FulfillmentRequest {
        FulfillmentRequest {
            external_id: OrderId::new(order_id),
            recipient: ShippingAddress::default(),
            items: vec![FulfillmentItem {
                product_id: ProductId::new("item-1"),
                product_name: "Poster".to_string(),
                variant: None,
                quantity: 1,
            }],
        }
    }

    #[tokio::test]
    async fn submit_assigns_sequential_refs() {
        let provider = InMemoryFulfillmentProvider::new();

        let r1 = provider.submit_order(request("ORD-1")).await.unwrap();
        let r2 = provider.submit_order(request("ORD-2")).await.unwrap();

        assert_eq!(r1.as_str(), "P-100");
        assert_eq!(r2.as_str(), "P-101");
        assert_eq!(provider.order_count(), 2);
    }

    #[tokio::test]
    async fn resubmission_is_deduplicated() {
        let provider = InMemoryFulfillmentProvider::new();

        let r1 = provider.submit_order(request("ORD-1")).await.unwrap();
        let r2 = provider.submit_order(request("ORD-1")).await.unwrap();

        assert_eq!(r1, r2);
        assert_eq!(provider.order_count(), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_consumed() {
        let provider = InMemoryFulfillmentProvider::new();
        provider.set_transient_failures(1);

        let first = provider.submit_order(request("ORD-1")).await;
        assert!(matches!(first, Err(ProviderError::Transient(_))));

        let second = provider.submit_order(request("ORD-1")).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn cancel_tracks_requests() {
        let provider = InMemoryFulfillmentProvider::new();
        let fulfillment_ref = provider.submit_order(request("ORD-1")).await.unwrap();

        provider.cancel_order(&fulfillment_ref).await.unwrap();
        assert!(provider.was_cancelled(&fulfillment_ref));

        let result = provider.cancel_order(&FulfillmentRef::new("P-999")).await;
        assert!(matches!(result, Err(ProviderError::Permanent(_))));
    }
}

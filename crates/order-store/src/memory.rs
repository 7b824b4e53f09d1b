use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{Order, OrderError};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{OrderFilter, OrderPage, OrderStore, Page};

/// In-memory order store for tests and development.
///
/// Mutations run under the map's write lock, which serializes concurrent
/// updates to the same order. The lock is held only for the duration of the
/// (pure) mutation closure, never across I/O.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Clears all orders.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        let order_id = order.order_id().clone();
        if orders.contains_key(&order_id) {
            return Err(StoreError::DuplicateOrder(order_id));
        }
        orders.insert(order_id, order);
        Ok(())
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(order_id).cloned())
    }

    async fn update<T, F>(&self, order_id: &OrderId, mut mutation: F) -> Result<(T, Order)>
    where
        T: Send,
        F: FnMut(&mut Order) -> std::result::Result<T, OrderError> + Send,
    {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::NotFound(order_id.clone()))?;

        // Apply to a scratch copy so a rejected mutation writes nothing.
        let mut candidate = order.clone();
        let value = mutation(&mut candidate)?;
        candidate.touch();
        *order = candidate.clone();

        Ok((value, candidate))
    }

    async fn list(&self, filter: OrderFilter, page: Page) -> Result<OrderPage> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        let total = matching.len() as u64;
        let selected: Vec<Order> = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .collect();

        Ok(OrderPage {
            orders: selected,
            page: page.page,
            per_page: page.per_page,
            total,
        })
    }
}

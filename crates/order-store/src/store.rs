use async_trait::async_trait;
use common::OrderId;
use domain::{Order, OrderError, OrderStatus, PaymentStatus};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Filter for administrative order listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl OrderFilter {
    /// Returns true if the order passes the filter.
    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|s| order.status() == s)
            && self
                .payment_status
                .is_none_or(|p| order.payment_status() == p)
    }
}

/// 1-based pagination request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Number of records to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

/// One page of orders, newest first.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl OrderPage {
    /// Total number of pages for this result set.
    pub fn pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.per_page))
    }
}

/// Durable store of orders with atomic per-order read-modify-write.
///
/// Implementations must make [`OrderStore::update`] race-free under
/// concurrent updates to the same order: the closure observes the latest
/// state and its result is persisted atomically, or the whole update is
/// retried/rejected. Callers must pass pure closures — no locking here may
/// span an external network call.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order. Fails with `DuplicateOrder` if the id exists;
    /// an existing record is never overwritten.
    async fn create(&self, order: Order) -> Result<()>;

    /// Loads an order by id.
    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>>;

    /// Atomically applies `mutation` to the order and persists the result.
    ///
    /// The closure may be invoked more than once if the implementation
    /// retries on contention; it must therefore be free of side effects
    /// beyond the order itself. A rejected mutation (`OrderError`) writes
    /// nothing. `updated_at` is stamped on every successful update.
    async fn update<T, F>(&self, order_id: &OrderId, mutation: F) -> Result<(T, Order)>
    where
        T: Send,
        F: FnMut(&mut Order) -> std::result::Result<T, OrderError> + Send;

    /// Pages through orders for administrative browsing, newest first.
    async fn list(&self, filter: OrderFilter, page: Page) -> Result<OrderPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_inputs() {
        let p = Page::new(0, 500);
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, 100);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn page_offset() {
        assert_eq!(Page::new(3, 20).offset(), 40);
    }

    #[test]
    fn order_page_pages() {
        let page = OrderPage {
            orders: vec![],
            page: 1,
            per_page: 10,
            total: 25,
        };
        assert_eq!(page.pages(), 3);
    }
}

//! Customer-facing notification fan-out.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{OrderId, TokenId};
use domain::OrderStatus;
use serde::{Deserialize, Serialize};

/// A notification emitted after a pipeline state change commits.
///
/// Notifications are best effort: they are sent after the store write and
/// a delivery failure never rolls back or fails the pipeline operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    OrderReceived {
        order_id: OrderId,
    },
    PaymentConfirmed {
        order_id: OrderId,
    },
    FulfillmentDispatched {
        order_id: OrderId,
        fulfillment_ref: String,
    },
    DeliveryStatusChanged {
        order_id: OrderId,
        status: OrderStatus,
    },
    CollectibleMinted {
        order_id: OrderId,
        token_id: TokenId,
        tx_ref: String,
    },
    OrderCancelled {
        order_id: OrderId,
        reason: String,
    },
}

/// Trait for the notification boundary.
#[async_trait]
pub trait NotificationRelay: Send + Sync {
    /// Delivers a notification. Implementations swallow delivery failures
    /// after logging them.
    async fn publish(&self, notification: Notification);
}

/// Relay that emits notifications as structured log events.
#[derive(Debug, Clone, Default)]
pub struct TracingRelay;

impl TracingRelay {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationRelay for TracingRelay {
    async fn publish(&self, notification: Notification) {
        metrics::counter!("pipeline_notifications_total").increment(1);
        match serde_json::to_string(&notification) {
            Ok(payload) => tracing::info!(notification = %payload, "notification published"),
            Err(e) => tracing::warn!(error = %e, "notification could not be serialized"),
        }
    }
}

/// Relay that records notifications for test assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingRelay {
    published: Arc<RwLock<Vec<Notification>>>,
}

impl RecordingRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all notifications published so far.
    pub fn published(&self) -> Vec<Notification> {
        self.published.read().unwrap().clone()
    }

    /// Returns the number of published notifications.
    pub fn count(&self) -> usize {
        self.published.read().unwrap().len()
    }
}

#[async_trait]
impl NotificationRelay for RecordingRelay {
    async fn publish(&self, notification: Notification) {
        self.published.write().unwrap().push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_relay_captures_in_order() {
        let relay = RecordingRelay::new();

        relay
            .publish(Notification::OrderReceived {
                order_id: OrderId::new("ORD-1"),
            })
            .await;
        relay
            .publish(Notification::PaymentConfirmed {
                order_id: OrderId::new("ORD-1"),
            })
            .await;

        let published = relay.published();
        assert_eq!(published.len(), 2);
        assert!(matches!(published[0], Notification::OrderReceived { .. }));
        assert!(matches!(published[1], Notification::PaymentConfirmed { .. }));
    }

    #[test]
    fn notification_wire_shape() {
        let n = Notification::DeliveryStatusChanged {
            order_id: OrderId::new("ORD-1"),
            status: OrderStatus::Shipped,
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["kind"], "delivery_status_changed");
        assert_eq!(json["status"], "shipped");
    }
}

//! Inbound shop events and provider status translation.

use common::OrderId;
use domain::{LineItem, Order, OrderError, OrderStatus, ShippingAddress};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// An order-created event as delivered by the shop front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub customer_contact: String,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    pub currency: String,
    pub items: Vec<LineItem>,
}

impl NewOrder {
    /// Builds the domain order, applying creation validation.
    pub fn into_order(self) -> Result<Order, OrderError> {
        Order::create(
            self.order_id,
            self.customer_contact,
            self.wallet_address,
            self.shipping_address,
            self.items,
            self.currency,
        )
    }
}

/// Translation of a provider's delivery status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatusUpdate {
    /// The order advanced along the delivery line.
    Progress(OrderStatus),
    /// The provider cancelled the order on its side.
    Cancelled,
}

/// Maps the provider's status vocabulary onto the order lifecycle.
///
/// Several provider states collapse onto one lifecycle state; anything
/// unrecognized is rejected rather than guessed at.
pub fn map_provider_status(status: &str) -> Result<ProviderStatusUpdate, PipelineError> {
    match status {
        "pending" | "inprocess" | "onhold" => {
            Ok(ProviderStatusUpdate::Progress(OrderStatus::Processing))
        }
        "fulfilled" | "shipped" => Ok(ProviderStatusUpdate::Progress(OrderStatus::Shipped)),
        "delivered" => Ok(ProviderStatusUpdate::Progress(OrderStatus::Delivered)),
        "canceled" | "cancelled" => Ok(ProviderStatusUpdate::Cancelled),
        other => Err(PipelineError::UnknownProviderStatus(other.to_string())),
    }
}

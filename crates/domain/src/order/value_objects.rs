//! Value objects for the order domain.

use chrono::{DateTime, Utc};
use common::{Money, ProductId, TokenId};
use serde::{Deserialize, Serialize};

/// Product category, determining which pipeline branches apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Digital,
    Subscription,
    Physical,
    Service,
}

impl ProductType {
    /// Returns true if items of this type are shipped by the fulfillment
    /// provider.
    pub fn is_fulfillable(&self) -> bool {
        matches!(self, ProductType::Physical)
    }

    /// Returns true if items of this type can carry a collectible token.
    pub fn is_nft_capable(&self) -> bool {
        matches!(self, ProductType::Physical | ProductType::Digital)
    }
}

/// A line item in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// The product identifier.
    pub product_id: ProductId,

    /// Human-readable product name.
    pub product_name: String,

    /// Quantity ordered.
    pub quantity: u32,

    /// Price per unit in cents.
    pub unit_price: Money,

    /// Optional variant selector (size, color).
    pub variant: Option<String>,

    /// Product category.
    pub product_type: ProductType,

    /// Whether purchasing this item entitles the buyer to a collectible
    /// token.
    pub nft_enabled: bool,

    /// Artwork used for the token metadata image.
    pub image_url: Option<String>,
}

impl LineItem {
    /// Creates a new line item with no variant, no NFT entitlement and no
    /// artwork.
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
        product_type: ProductType,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
            variant: None,
            product_type,
            nft_enabled: false,
            image_url: None,
        }
    }

    /// Marks the item as NFT-entitled.
    pub fn with_nft(mut self) -> Self {
        self.nft_enabled = true;
        self
    }

    /// Sets the variant selector.
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Sets the token artwork URL.
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Returns the total price for this item (quantity * unit_price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    /// Returns true if this item both allows and requests a token.
    pub fn is_nft_eligible(&self) -> bool {
        self.nft_enabled && self.product_type.is_nft_capable()
    }
}

/// Shipping destination for physical items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShippingAddress {
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state_code: Option<String>,
    pub zip: String,
    pub country: String,
}

/// External fulfillment provider order reference.
///
/// Set at most once per order; repeated dispatch attempts must observe the
/// existing reference and skip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FulfillmentRef(String);

impl FulfillmentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FulfillmentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for FulfillmentRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FulfillmentRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Token state recorded on the order.
///
/// `minted == true` implies `mint_tx_ref` is set; once minted the record is
/// immutable. A record with `minted == false` marks a submitted but
/// unconfirmed mint awaiting a poll result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftRecord {
    pub token_id: TokenId,
    pub mint_tx_ref: Option<String>,
    pub minted: bool,
}

impl NftRecord {
    /// Record for a submitted mint whose confirmation is still outstanding.
    pub fn pending(token_id: TokenId) -> Self {
        Self {
            token_id,
            mint_tx_ref: None,
            minted: false,
        }
    }

    /// Record for a confirmed mint.
    pub fn confirmed(token_id: TokenId, mint_tx_ref: impl Into<String>) -> Self {
        Self {
            token_id,
            mint_tx_ref: Some(mint_tx_ref.into()),
            minted: true,
        }
    }
}

/// Pipeline stage a failure annotation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Fulfillment,
    Mint,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Fulfillment => write!(f, "fulfillment"),
            PipelineStage::Mint => write!(f, "mint"),
        }
    }
}

/// A permanent-failure annotation requiring operator action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureNote {
    pub stage: PipelineStage,
    pub reason: String,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_item_total_price() {
        let item = LineItem::new(
            "item-1",
            "Poster",
            3,
            Money::from_cents(1000),
            ProductType::Physical,
        );
        assert_eq!(item.total_price().cents(), 3000);
    }

    #[test]
    fn nft_eligibility_requires_flag_and_capable_type() {
        let physical = LineItem::new(
            "item-1",
            "Poster",
            1,
            Money::from_cents(1000),
            ProductType::Physical,
        );
        assert!(!physical.is_nft_eligible());
        assert!(physical.clone().with_nft().is_nft_eligible());

        let service = LineItem::new(
            "svc-1",
            "Consulting",
            1,
            Money::from_cents(50000),
            ProductType::Service,
        )
        .with_nft();
        assert!(!service.is_nft_eligible());
    }

    #[test]
    fn nft_record_states() {
        let token = TokenId::derive(&"ORD-1".into(), &"item-1".into());

        let pending = NftRecord::pending(token);
        assert!(!pending.minted);
        assert!(pending.mint_tx_ref.is_none());

        let confirmed = NftRecord::confirmed(token, "0xabc");
        assert!(confirmed.minted);
        assert_eq!(confirmed.mint_tx_ref.as_deref(), Some("0xabc"));
    }

    #[test]
    fn line_item_serialization_roundtrip() {
        let item = LineItem::new(
            "item-1",
            "Poster",
            2,
            Money::from_cents(999),
            ProductType::Physical,
        )
        .with_nft()
        .with_variant("A2");

        let json = serde_json::to_string(&item).unwrap();
        let back: LineItem = serde_json::from_str(&json).unwrap();
        assert_eq!(item, back);
    }
}

//! Order record and its value objects.

mod record;
mod state;
mod value_objects;

pub use record::{Order, StatusApplied};
pub use state::{OrderStatus, PaymentStatus};
pub use value_objects::{
    FailureNote, FulfillmentRef, LineItem, NftRecord, PipelineStage, ProductType, ShippingAddress,
};

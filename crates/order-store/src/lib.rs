//! Durable order records.
//!
//! The pipeline's correctness under concurrent webhook delivery rests on
//! this crate: [`OrderStore::update`] applies a mutation closure atomically
//! per order, so two events racing on the same order serialize at the store
//! rather than interleaving. Two implementations are provided: an
//! in-memory store for tests and development, and a PostgreSQL store using
//! optimistic versioning with transparent bounded retry.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::{OrderFilter, OrderPage, OrderStore, Page};

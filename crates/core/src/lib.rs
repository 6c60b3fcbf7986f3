//! `restock-core` — shared domain vocabulary.
//!
//! Identifiers, the SKU catalog and engine settings used by the ledger,
//! planner, receiving, and store crates. Pure types only, no IO.

pub mod catalog;
pub mod error;
pub mod id;
pub mod settings;
pub mod sku;

pub use catalog::{Catalog, InMemoryCatalog};
pub use error::{DomainError, DomainResult};
pub use id::{DocumentId, OrderId, SkuCode, SupplierId, TransactionId};
pub use settings::{EngineSettings, MAX_LOOKBACK_DAYS, check_lookback};
pub use sku::{Boost, DemandVariability, SkuRecord};

//! `restock-store` — durability, concurrency and the engine façade.
//!
//! Everything impure lives here: the single durable JSON file with its
//! atomic-replace protocol and backup trail, the writer lock and retry
//! pacing, and the [`Engine`] that validates domain operations before
//! letting them touch the store. The domain crates underneath stay
//! deterministic and IO-free.

pub mod durable;
pub mod engine;
pub mod error;
pub mod lock;
pub mod state;


pub use durable::FileStore;
pub use engine::{Engine, OrderProposal, ReceiptOutcome, StoreOptions};
pub use error::{EngineError, EngineResult, StoreError};
pub use lock::{LeaseTracker, RetryPolicy, WriterLock};
pub use state::{ProcessedDocument, StoreState, SCHEMA_VERSION};

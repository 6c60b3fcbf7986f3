//! `restock-ledger` — append-only stock ledger and replay.
//!
//! Stock-affecting facts are recorded as immutable transactions; all
//! point-in-time state (on-hand, on-order, unfulfilled demand) is
//! derived by replaying them in ledger order. Nothing here persists or
//! locks; that is the store's job.

pub mod replay;
pub mod transaction;

pub use replay::{days_out_of_stock, replay, ReplayAnomaly, StockSnapshot};
pub use transaction::{DraftTransaction, PostedTransaction, TxKind};

//! Durable state tables.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use restock_core::DocumentId;
use restock_ledger::PostedTransaction;
use restock_receiving::{LineItem, Order, OrderUpdate};

/// Bumped when a new field is added. Fields are only ever added, with
/// serde defaults, so older files stay readable.
pub const SCHEMA_VERSION: u32 = 1;

fn initial_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Permanent record of a processed delivery document.
///
/// Its presence is what makes resubmission a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub document_id: DocumentId,
    pub receipt_date: NaiveDate,
    pub lines: Vec<LineItem>,
    /// Order linkages as they resulted from allocation.
    pub order_updates: Vec<OrderUpdate>,
    #[serde(default)]
    pub notes: Option<String>,
    pub processed_at: DateTime<Utc>,
}

/// Everything the engine persists, in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default = "initial_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub next_seq: u64,
    #[serde(default)]
    pub transactions: Vec<PostedTransaction>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub documents: Vec<ProcessedDocument>,
}

impl StoreState {
    pub fn empty() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            next_seq: 1,
            transactions: Vec::new(),
            orders: Vec::new(),
            documents: Vec::new(),
        }
    }

    /// Hand out the next ledger sequence number.
    pub fn allocate_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub fn document(&self, document_id: &DocumentId) -> Option<&ProcessedDocument> {
        self.documents
            .iter()
            .find(|doc| &doc.document_id == document_id)
    }

    pub fn is_document_processed(&self, document_id: &DocumentId) -> bool {
        self.document(document_id).is_some()
    }

    /// Repair the sequence counter after loading a file that predates
    /// it (or was edited by hand). Appends must never reuse a seq.
    pub fn normalize(&mut self) {
        let max_seq = self
            .transactions
            .iter()
            .map(PostedTransaction::seq)
            .max()
            .unwrap_or(0);
        if self.next_seq <= max_seq {
            self.next_seq = max_seq + 1;
        }
        if self.next_seq == 0 {
            self.next_seq = 1;
        }
    }
}

impl Default for StoreState {
    fn default() -> Self {
        Self::empty()
    }
}

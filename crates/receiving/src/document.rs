//! Delivery documents.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use restock_core::{DocumentId, DomainError, DomainResult, OrderId, SkuCode};

/// One received line of a delivery document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: SkuCode,
    pub qty: i64,
    /// Explicit allocation targets, in priority order. Empty means
    /// allocate FIFO across the SKU's open orders.
    #[serde(default)]
    pub order_ids: Vec<OrderId>,
    #[serde(default)]
    pub lot_expiry: Option<NaiveDate>,
}

impl LineItem {
    pub fn new(sku: SkuCode, qty: i64) -> Self {
        Self {
            sku,
            qty,
            order_ids: Vec::new(),
            lot_expiry: None,
        }
    }

    pub fn with_orders(mut self, order_ids: Vec<OrderId>) -> Self {
        self.order_ids = order_ids;
        self
    }

    pub fn with_lot_expiry(mut self, lot_expiry: NaiveDate) -> Self {
        self.lot_expiry = Some(lot_expiry);
        self
    }
}

/// A delivery document (e.g. a supplier delivery note).
///
/// `document_id` is the idempotency key: once a document is processed
/// its id is recorded forever and resubmission is a reported no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivingDocument {
    pub document_id: DocumentId,
    pub receipt_date: NaiveDate,
    pub lines: Vec<LineItem>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReceivingDocument {
    pub fn new(document_id: DocumentId, receipt_date: NaiveDate, lines: Vec<LineItem>) -> Self {
        Self {
            document_id,
            receipt_date,
            lines,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Structural validation. Order references are checked later by the
    /// allocation planner, SKU existence by the engine's catalog.
    pub fn validate(&self) -> DomainResult<()> {
        if self.lines.is_empty() {
            return Err(DomainError::validation("document has no line items"));
        }
        for line in &self.lines {
            if line.qty <= 0 {
                return Err(DomainError::validation(format!(
                    "line for {} has a non-positive quantity",
                    line.sku
                )));
            }
        }
        Ok(())
    }
}

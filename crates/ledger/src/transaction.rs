//! Ledger transactions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use restock_core::{DomainError, DomainResult, OrderId, SkuCode, TransactionId};

/// Kind of a stock-affecting event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    /// Goods sold; decreases on-hand.
    Sale,
    /// Goods received; increases on-hand and, when linked to an order,
    /// decreases on-order.
    Receipt,
    /// Signed correction applied directly to on-hand.
    Adjustment,
    /// A purchase order was placed; increases on-order.
    OrderPlaced,
    /// Demand that could not be served; tracked for boost decisions.
    Unfulfilled,
}

impl core::fmt::Display for TxKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            TxKind::Sale => "sale",
            TxKind::Receipt => "receipt",
            TxKind::Adjustment => "adjustment",
            TxKind::OrderPlaced => "order_placed",
            TxKind::Unfulfilled => "unfulfilled",
        };
        f.write_str(name)
    }
}

/// A transaction that has not been appended yet.
///
/// Quantities are kind-typed magnitudes: every kind carries a strictly
/// positive `qty` except `Adjustment`, which carries a non-zero signed
/// delta. Validation runs at the append seam, not at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftTransaction {
    pub sku: SkuCode,
    pub kind: TxKind,
    pub qty: i64,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub lot_expiry: Option<NaiveDate>,
    /// Weak back-reference: relation only, never ownership.
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

impl DraftTransaction {
    pub fn new(sku: SkuCode, kind: TxKind, qty: i64, event_date: NaiveDate) -> Self {
        Self {
            sku,
            kind,
            qty,
            event_date,
            lot_expiry: None,
            order_id: None,
        }
    }

    pub fn with_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_lot_expiry(mut self, lot_expiry: NaiveDate) -> Self {
        self.lot_expiry = Some(lot_expiry);
        self
    }

    /// Kind/sign consistency plus linkage rules.
    pub fn validate(&self) -> DomainResult<()> {
        match self.kind {
            TxKind::Adjustment => {
                if self.qty == 0 {
                    return Err(DomainError::validation("adjustment delta cannot be zero"));
                }
            }
            _ => {
                if self.qty <= 0 {
                    return Err(DomainError::validation(format!(
                        "{} quantity must be positive",
                        self.kind
                    )));
                }
            }
        }
        if self.order_id.is_some()
            && !matches!(self.kind, TxKind::Receipt | TxKind::OrderPlaced)
        {
            return Err(DomainError::validation(
                "order linkage only applies to receipt and order_placed",
            ));
        }
        if self.lot_expiry.is_some() && self.kind != TxKind::Receipt {
            return Err(DomainError::validation("lot expiry only applies to receipt"));
        }
        Ok(())
    }
}

/// A transaction in the ledger.
///
/// Immutable once written; `seq` is the store-assigned monotonic
/// position. Replay order is `(event_date, seq)`, so insertion order
/// breaks event-date ties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedTransaction {
    transaction_id: TransactionId,
    seq: u64,
    posted_at: DateTime<Utc>,
    sku: SkuCode,
    kind: TxKind,
    qty: i64,
    event_date: NaiveDate,
    #[serde(default)]
    lot_expiry: Option<NaiveDate>,
    #[serde(default)]
    order_id: Option<OrderId>,
}

impl PostedTransaction {
    /// Validate a draft and seal it with its ledger position.
    ///
    /// Construction is the only way in, so a held value is known valid.
    pub fn post(
        draft: DraftTransaction,
        seq: u64,
        posted_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        draft.validate()?;
        Ok(Self {
            transaction_id: TransactionId::new(),
            seq,
            posted_at,
            sku: draft.sku,
            kind: draft.kind,
            qty: draft.qty,
            event_date: draft.event_date,
            lot_expiry: draft.lot_expiry,
            order_id: draft.order_id,
        })
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn posted_at(&self) -> DateTime<Utc> {
        self.posted_at
    }

    pub fn sku(&self) -> &SkuCode {
        &self.sku
    }

    pub fn kind(&self) -> TxKind {
        self.kind
    }

    pub fn qty(&self) -> i64 {
        self.qty
    }

    pub fn event_date(&self) -> NaiveDate {
        self.event_date
    }

    pub fn lot_expiry(&self) -> Option<NaiveDate> {
        self.lot_expiry
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_sku() -> SkuCode {
        SkuCode::new("WIDGET-01").unwrap()
    }

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn positive_magnitudes_pass_validation() {
        let draft = DraftTransaction::new(test_sku(), TxKind::Sale, 3, test_date());
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn zero_or_negative_sale_is_rejected() {
        let zero = DraftTransaction::new(test_sku(), TxKind::Sale, 0, test_date());
        let negative = DraftTransaction::new(test_sku(), TxKind::Sale, -2, test_date());
        assert!(zero.validate().is_err());
        assert!(negative.validate().is_err());
    }

    #[test]
    fn adjustment_allows_negative_delta_but_not_zero() {
        let negative = DraftTransaction::new(test_sku(), TxKind::Adjustment, -5, test_date());
        let zero = DraftTransaction::new(test_sku(), TxKind::Adjustment, 0, test_date());
        assert!(negative.validate().is_ok());
        assert!(zero.validate().is_err());
    }

    #[test]
    fn order_linkage_is_restricted_to_receipt_kinds() {
        let linked_sale = DraftTransaction::new(test_sku(), TxKind::Sale, 3, test_date())
            .with_order(OrderId::new());
        assert!(linked_sale.validate().is_err());

        let linked_receipt = DraftTransaction::new(test_sku(), TxKind::Receipt, 3, test_date())
            .with_order(OrderId::new());
        assert!(linked_receipt.validate().is_ok());
    }

    #[test]
    fn lot_expiry_is_restricted_to_receipts() {
        let expiry = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let sale = DraftTransaction::new(test_sku(), TxKind::Sale, 3, test_date())
            .with_lot_expiry(expiry);
        assert!(sale.validate().is_err());

        let receipt = DraftTransaction::new(test_sku(), TxKind::Receipt, 3, test_date())
            .with_lot_expiry(expiry);
        assert!(receipt.validate().is_ok());
    }

    #[test]
    fn posting_rejects_invalid_drafts() {
        let draft = DraftTransaction::new(test_sku(), TxKind::Sale, 0, test_date());
        assert!(PostedTransaction::post(draft, 1, Utc::now()).is_err());
    }

    #[test]
    fn posted_transaction_round_trips_through_serde() {
        let draft = DraftTransaction::new(test_sku(), TxKind::Receipt, 12, test_date())
            .with_order(OrderId::new());
        let posted = PostedTransaction::post(draft, 7, Utc::now()).unwrap();

        let json = serde_json::to_string(&posted).unwrap();
        let back: PostedTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, posted);
        assert_eq!(back.seq(), 7);
    }
}
